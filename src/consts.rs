//! Shared numeric constants for the editor.

// ── Colors ──────────────────────────────────────────────────────

/// Wireframe color of a hovered cube.
pub const HOVER_COLOR: u32 = 0x00_0000;

/// Wireframe color of a cube that is neither hovered nor selected.
pub const IDLE_COLOR: u32 = 0xD3_D3D3;

/// Wireframe color of a selected cube. Takes precedence over hover.
pub const SELECTED_COLOR: u32 = 0xFF_0000;

/// Fill color of cube faces.
pub const FACE_COLOR: u32 = 0xFF_FFFF;

// ── Cubes ───────────────────────────────────────────────────────

/// Edge length of a cube when none is given.
pub const DEFAULT_CUBE_SIZE: f64 = 20.0;

/// Maximum number of clones a single `recurse` call produces.
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

// ── Manipulation ────────────────────────────────────────────────

/// Rotation gain applied to the vertical component of a drag delta.
pub const ROTATE_SPEED: f64 = 0.03;

/// Rotation gain applied to horizontal pointer motion (yaw).
pub const ROTATE_POINTER_SPEED: f64 = 0.003;

/// Scale added per unit of scale factor, per chain level.
pub const SCALE_STEP: f64 = 0.01;

/// Scale factor per pixel of wheel motion when a selection exists.
pub const WHEEL_SCALE_STEP: f64 = 0.05;

// ── Camera ──────────────────────────────────────────────────────

/// Default vertical field of view in degrees.
pub const DEFAULT_FOV_DEG: f64 = 70.0;

/// Field of view bounds in degrees.
pub const MIN_FOV_DEG: f64 = 10.0;
pub const MAX_FOV_DEG: f64 = 150.0;

/// Degrees of field of view per pixel of wheel motion when nothing is selected.
pub const FOV_WHEEL_STEP: f64 = 0.05;

/// Degrees of orbit per pixel of camera drag.
pub const ORBIT_SPEED: f64 = 0.4;

/// Orbit latitude clamp in degrees; keeps the camera off the poles.
pub const MAX_LATITUDE_DEG: f64 = 85.0;

/// Distance from the camera to its target.
pub const CAMERA_DISTANCE: f64 = 100.0;

/// Near and far clip distances.
pub const NEAR_CLIP: f64 = 1.0;
pub const FAR_CLIP: f64 = 1100.0;
