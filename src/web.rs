//! Browser facade: the `wasm-bindgen` surface the host page talks to.
//!
//! The page creates one [`Editor`] per canvas, forwards DOM pointer, wheel,
//! and key events to it, and calls [`Editor::start_loop`] once. Every input
//! method returns the resulting actions as a JSON array string so the page
//! can react (cursor changes, scene membership) without sharing Rust types.
//!
//! Actions produced by the animation loop wait in a bounded queue until the
//! page calls [`Editor::drain_actions`], which it should do once per frame.

#[cfg(test)]
#[path = "web_test.rs"]
mod web_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::DVec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{OrbitCamera, Point};
use crate::config::EditorConfig;
use crate::demo::{DemoPlayer, PlayerStatus};
use crate::engine::{Action, EngineCore};
use crate::input::{Button, Key, Modifiers, WheelDelta};
use crate::render;

/// Install the panic hook and route `log`/`tracing` output to the console.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Debug) {
        tracing::debug!(%err, "console logger already installed");
    }
}

/// DOM modifier bits: 1 = shift, 2 = ctrl, 4 = alt, 8 = meta.
fn modifiers(bits: u8) -> Modifiers {
    Modifiers { shift: bits & 1 != 0, ctrl: bits & 2 != 0, alt: bits & 4 != 0, meta: bits & 8 != 0 }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Most loop actions held for the page between drains.
const PENDING_LIMIT: usize = 4096;

/// Queue `actions` for the page, dropping the oldest beyond [`PENDING_LIMIT`].
fn enqueue(pending: &mut Vec<Action>, actions: Vec<Action>) {
    pending.extend(actions);
    if pending.len() > PENDING_LIMIT {
        let dropped = pending.len() - PENDING_LIMIT;
        pending.drain(..dropped);
        tracing::warn!(dropped, "actions not drained; oldest dropped");
    }
}

/// Everything one canvas needs, shared between the exported methods and the
/// animation-frame callback.
struct Session {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    core: EngineCore<OrbitCamera>,
    demo: DemoPlayer,
    rng: StdRng,
    dpr: f64,
    /// Actions produced outside input handlers (demo frames), awaiting the host.
    pending: Vec<Action>,
}

impl Session {
    fn render(&self) -> Result<(), JsValue> {
        let camera = &self.core.viewport;
        render::draw(&self.ctx, &self.core.registry, camera, camera.width, camera.height, self.dpr)
    }

    /// One animation frame: advance the demo, collect its actions, redraw.
    fn frame(&mut self) {
        if self.demo.is_running() {
            let status = self.demo.tick(&mut self.core);
            if status == PlayerStatus::Complete {
                tracing::debug!("demo finished");
            }
        }
        let actions = self.core.drain_actions();
        enqueue(&mut self.pending, actions);
        if let Err(err) = self.render() {
            tracing::warn!(?err, "render failed");
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn resize(&mut self, width: f64, height: f64, dpr: f64) {
        self.dpr = dpr;
        self.canvas.set_width((width * dpr).round().max(0.0) as u32);
        self.canvas.set_height((height * dpr).round().max(0.0) as u32);
        self.core.viewport.set_size(width, height);
    }
}

fn request_frame(callback: &Closure<dyn FnMut(f64)>) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    Ok(())
}

/// The editor bound to one canvas element.
#[wasm_bindgen]
pub struct Editor {
    session: Rc<RefCell<Session>>,
    looping: Rc<Cell<bool>>,
    frame_cb: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
}

#[wasm_bindgen]
impl Editor {
    /// Bind to `canvas`. `config_json` may override any [`EditorConfig`] field.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config or when the canvas has no 2D context.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config_json: Option<String>) -> Result<Editor, JsValue> {
        let config = match config_json {
            Some(json) => EditorConfig::from_json(&json).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let core = EngineCore::with_config(config).map_err(js_error)?;
        let seed = js_sys::Math::random().to_bits();
        tracing::info!(seed, "editor created");

        let session = Session {
            canvas,
            ctx,
            core,
            demo: DemoPlayer::default(),
            rng: StdRng::seed_from_u64(seed),
            dpr: 1.0,
            pending: Vec::new(),
        };
        Ok(Self {
            session: Rc::new(RefCell::new(session)),
            looping: Rc::new(Cell::new(false)),
            frame_cb: Rc::new(RefCell::new(None)),
        })
    }

    /// Start the `requestAnimationFrame` loop. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when there is no window to schedule frames on.
    #[wasm_bindgen(js_name = startLoop)]
    pub fn start_loop(&self) -> Result<(), JsValue> {
        if self.looping.replace(true) {
            return Ok(());
        }
        if let Some(cb) = self.frame_cb.borrow().as_ref() {
            return request_frame(cb);
        }

        let session = Rc::clone(&self.session);
        let looping = Rc::clone(&self.looping);
        let holder = Rc::clone(&self.frame_cb);
        let cb = Closure::wrap(Box::new(move |_ts: f64| {
            session.borrow_mut().frame();
            if !looping.get() {
                return;
            }
            if let Some(cb) = holder.borrow().as_ref() {
                if let Err(err) = request_frame(cb) {
                    tracing::warn!(?err, "could not schedule frame");
                    looping.set(false);
                }
            }
        }) as Box<dyn FnMut(f64)>);

        let scheduled = request_frame(&cb);
        *self.frame_cb.borrow_mut() = Some(cb);
        if scheduled.is_err() {
            self.looping.set(false);
        }
        scheduled
    }

    /// Stop rescheduling frames after the current one.
    #[wasm_bindgen(js_name = stopLoop)]
    pub fn stop_loop(&self) {
        self.looping.set(false);
    }

    /// Draw immediately.
    ///
    /// # Errors
    ///
    /// Propagates Canvas2D failures.
    pub fn render(&self) -> Result<(), JsValue> {
        self.session.borrow().render()
    }

    /// Update the viewport size (CSS pixels) and device pixel ratio.
    pub fn resize(&self, width: f64, height: f64, dpr: f64) {
        self.session.borrow_mut().resize(width, height, dpr);
    }

    // --- Input events ---

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f64, y: f64, button: i16, mods: u8) -> Result<String, JsValue> {
        let Some(button) = Button::from_dom(button) else {
            return Ok("[]".to_owned());
        };
        let actions = self.session.borrow_mut().core.on_pointer_down(Point::new(x, y), button, modifiers(mods));
        to_json(&actions)
    }

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64, mods: u8) -> Result<String, JsValue> {
        let actions = self.session.borrow_mut().core.on_pointer_move(Point::new(x, y), modifiers(mods));
        to_json(&actions)
    }

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self, x: f64, y: f64, button: i16, mods: u8) -> Result<String, JsValue> {
        let Some(button) = Button::from_dom(button) else {
            return Ok("[]".to_owned());
        };
        let actions = self.session.borrow_mut().core.on_pointer_up(Point::new(x, y), button, modifiers(mods));
        to_json(&actions)
    }

    /// Pointer capture lost or the pointer left the canvas.
    ///
    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = pointerCancel)]
    pub fn pointer_cancel(&self) -> Result<String, JsValue> {
        let actions = self.session.borrow_mut().core.on_pointer_cancel();
        to_json(&actions)
    }

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    pub fn wheel(&self, x: f64, y: f64, dx: f64, dy: f64, mods: u8) -> Result<String, JsValue> {
        let actions = self.session.borrow_mut().core.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, modifiers(mods));
        to_json(&actions)
    }

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&self, key: String, mods: u8) -> Result<String, JsValue> {
        let actions = self.session.borrow_mut().core.on_key_down(&Key(key), modifiers(mods));
        to_json(&actions)
    }

    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&self, x: f64, y: f64) -> Result<String, JsValue> {
        let actions = self.session.borrow_mut().core.on_double_click(Point::new(x, y));
        to_json(&actions)
    }

    // --- Editing commands ---

    /// Create a cube and return its id.
    ///
    /// # Errors
    ///
    /// Fails when `size` is not positive or any input is not finite.
    #[wasm_bindgen(js_name = createCube)]
    pub fn create_cube(&self, x: f64, y: f64, z: f64, size: f64) -> Result<String, JsValue> {
        self.session
            .borrow_mut()
            .core
            .create_cube(size, DVec3::new(x, y, z))
            .map(|id| id.to_string())
            .ok_or_else(|| JsValue::from_str("cube size must be positive and coordinates finite"))
    }

    /// Duplicate the selection; returns the new ids as JSON.
    ///
    /// # Errors
    ///
    /// Fails only if the ids cannot be serialized.
    #[wasm_bindgen(js_name = duplicateSelection)]
    pub fn duplicate_selection(&self) -> Result<String, JsValue> {
        let created = self.session.borrow_mut().core.duplicate_selection();
        to_json(&created)
    }

    /// Delete the selection; returns the removed ids as JSON.
    ///
    /// # Errors
    ///
    /// Fails only if the ids cannot be serialized.
    #[wasm_bindgen(js_name = deleteSelection)]
    pub fn delete_selection(&self) -> Result<String, JsValue> {
        let removed = self.session.borrow_mut().core.delete_selection();
        to_json(&removed)
    }

    #[wasm_bindgen(js_name = deselectAll)]
    pub fn deselect_all(&self) {
        self.session.borrow_mut().core.deselect_all();
    }

    #[wasm_bindgen(js_name = resetCamera)]
    pub fn reset_camera(&self) {
        self.session.borrow_mut().core.reset_camera();
    }

    // --- Queries ---

    /// Snapshot of one cube as JSON, or `undefined` for an unknown id.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not a UUID.
    pub fn cube(&self, id: &str) -> Result<Option<String>, JsValue> {
        let id = uuid::Uuid::parse_str(id).map_err(js_error)?;
        self.session.borrow().core.cube(&id).map(|snap| to_json(&snap)).transpose()
    }

    /// Selected ids as a JSON array.
    ///
    /// # Errors
    ///
    /// Fails only if the ids cannot be serialized.
    pub fn selection(&self) -> Result<String, JsValue> {
        to_json(self.session.borrow().core.selection())
    }

    /// Actions queued since the last call: demo frames and direct edits.
    ///
    /// # Errors
    ///
    /// Fails only if the actions cannot be serialized.
    #[wasm_bindgen(js_name = drainActions)]
    pub fn drain_actions(&self) -> Result<String, JsValue> {
        let mut session = self.session.borrow_mut();
        let mut actions = std::mem::take(&mut session.pending);
        actions.extend(session.core.drain_actions());
        to_json(&actions)
    }

    // --- Demo ---

    /// Load a JSON demo script, replacing the current one.
    ///
    /// # Errors
    ///
    /// Fails on a malformed or invalid script.
    #[wasm_bindgen(js_name = loadDemo)]
    pub fn load_demo(&self, json: &str) -> Result<(), JsValue> {
        let player = DemoPlayer::from_json(json).map_err(js_error)?;
        let mut session = self.session.borrow_mut();
        let Session { core, demo, .. } = &mut *session;
        demo.reset(core);
        *demo = player;
        Ok(())
    }

    /// Reset the scene's demo cubes and play from the top. With `regen`, a
    /// fresh random stock program replaces the script first.
    #[wasm_bindgen(js_name = startDemo)]
    pub fn start_demo(&self, regen: bool) {
        let mut session = self.session.borrow_mut();
        let Session { core, demo, rng, .. } = &mut *session;
        if regen || demo.actions().is_empty() {
            demo.start(core, Some(rng));
        } else {
            demo.start(core, None);
        }
    }

    #[wasm_bindgen(js_name = pauseDemo)]
    pub fn pause_demo(&self) {
        self.session.borrow_mut().demo.pause();
    }

    #[wasm_bindgen(js_name = playDemo)]
    pub fn play_demo(&self) {
        self.session.borrow_mut().demo.play();
    }

    #[wasm_bindgen(js_name = resetDemo)]
    pub fn reset_demo(&self) {
        let mut session = self.session.borrow_mut();
        let Session { core, demo, .. } = &mut *session;
        demo.reset(core);
    }

    #[wasm_bindgen(js_name = demoRunning)]
    pub fn demo_running(&self) -> bool {
        self.session.borrow().demo.is_running()
    }
}
