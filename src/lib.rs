//! Cube manipulation engine for the browser scene editor.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! editing model of the viewport: the cubes and their transforms, hover and
//! selection, the pointer gesture state machine that turns raw input into
//! move/rotate/scale/duplicate intents, and the recursive duplication of cube
//! chains. The host page only wires DOM events to [`web::Editor`] and honors
//! the returned [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Gesture router and the testable [`engine::EngineCore`] |
//! | [`registry`] | Cube arena, selection set, and chain operations |
//! | [`cube`] | Cube records, colors, snapshots, and link vectors |
//! | [`transform`] | Baseline + delta transform channels |
//! | [`input`] | Input event types and the gesture state |
//! | [`camera`] | Orbit camera, screen rays, and the [`camera::Viewport`] seam |
//! | [`hit`] | Rays, reference planes, and cube hit-testing |
//! | [`demo`] | Scripted action player |
//! | [`config`] | Per-viewport configuration |
//! | [`render`] | Canvas2D wireframe renderer |
//! | [`web`] | `wasm-bindgen` facade for the host page |
//! | [`consts`] | Shared numeric constants (colors, speeds, limits) |

pub mod camera;
pub mod config;
pub mod consts;
pub mod cube;
pub mod demo;
pub mod engine;
pub mod hit;
pub mod input;
pub mod registry;
pub mod render;
pub mod transform;
pub mod web;
