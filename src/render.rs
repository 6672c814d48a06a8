//! Rendering: draws the cube scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives read-only views of the registry and camera and produces pixels;
//! it does not mutate any editor state.
//!
//! Cubes are drawn back to front (painter's order) as white faces with a
//! colored outline, which hides the edges behind each cube without a depth
//! buffer.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::web::Editor::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use glam::DVec3;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{OrbitCamera, Point};
use crate::consts::FACE_COLOR;
use crate::cube::Cube;
use crate::registry::CubeRegistry;
use crate::transform::Attr;

/// Corner indices of each face, in outline order. Corner `i` has
/// x = bit 0, y = bit 1, z = bit 2.
const FACES: [[usize; 4]; 6] = [
    [0, 2, 6, 4],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 1, 3, 2],
    [4, 5, 7, 6],
];

/// Outline width in CSS pixels.
const EDGE_WIDTH_PX: f64 = 1.0;

/// Background fill.
const BACKGROUND: &str = "#F5F5F5";

/// A face ready to draw: its screen outline and distance from the eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedFace {
    pub outline: [Point; 4],
    pub depth: f64,
}

/// Draw the full scene.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    registry: &CubeRegistry,
    camera: &OrbitCamera,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, viewport_w, viewport_h);
    ctx.set_line_width(EDGE_WIDTH_PX);

    let face_fill = css_color(FACE_COLOR);
    for cube in draw_order(registry, camera.eye()) {
        let Some(faces) = project_cube(cube, camera) else {
            continue;
        };
        let stroke = css_color(cube.color());
        for face in faces {
            draw_face(ctx, &face, &face_fill, &stroke);
        }
    }
    Ok(())
}

fn draw_face(ctx: &CanvasRenderingContext2d, face: &ProjectedFace, fill: &str, stroke: &str) {
    let [first, rest @ ..] = face.outline;
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for p in rest {
        ctx.line_to(p.x, p.y);
    }
    ctx.close_path();
    ctx.set_fill_style_str(fill);
    ctx.fill();
    ctx.set_stroke_style_str(stroke);
    ctx.stroke();
}

/// Cubes sorted farthest first.
#[must_use]
pub fn draw_order(registry: &CubeRegistry, eye: DVec3) -> Vec<&Cube> {
    let mut cubes: Vec<(f64, &Cube)> = registry
        .iter()
        .map(|c| (c.transform.get(Attr::Position).distance_squared(eye), c))
        .collect();
    cubes.sort_by(|a, b| b.0.total_cmp(&a.0));
    cubes.into_iter().map(|(_, c)| c).collect()
}

/// Project a cube's faces to screen space, farthest face first.
///
/// Returns `None` if any corner is behind the camera; such cubes are skipped
/// rather than drawn with wrapped-around geometry.
#[must_use]
pub fn project_cube(cube: &Cube, camera: &OrbitCamera) -> Option<Vec<ProjectedFace>> {
    let corners = cube.world_corners();
    let mut screen = [Point::default(); 8];
    for (slot, corner) in screen.iter_mut().zip(corners) {
        *slot = camera.world_to_screen(corner)?;
    }
    let eye = camera.eye();
    let mut faces: Vec<ProjectedFace> = FACES
        .iter()
        .map(|&idx| {
            let center = idx.iter().map(|&i| corners[i]).sum::<DVec3>() / 4.0;
            ProjectedFace { outline: idx.map(|i| screen[i]), depth: center.distance_squared(eye) }
        })
        .collect();
    faces.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    Some(faces)
}

/// `0xRRGGBB` as a CSS hex color.
#[must_use]
pub fn css_color(rgb: u32) -> String {
    format!("#{:06X}", rgb & 0x00FF_FFFF)
}
