//! Orbit camera, screen-space rays, and the viewport seam the engine consumes.
//!
//! The engine never does projection math itself. It asks a [`Viewport`] to
//! cast a ray against cube geometry or to intersect the reference plane, and
//! to report or change the orbit. [`OrbitCamera`] is the browser
//! implementation: a perspective camera circling a target at a fixed
//! distance, steered by longitude/latitude in degrees.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use glam::{DMat4, DVec3, DVec4};

use crate::config::{ConfigError, EditorConfig};
use crate::consts::{FAR_CLIP, NEAR_CLIP};
use crate::cube::HitHandle;
use crate::hit::{HitTarget, Ray, ReferencePlane, nearest_hit};

/// A point in screen space (CSS pixels, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Camera and ray services consumed by the gesture router.
pub trait Viewport {
    /// Handle of the nearest target under `screen`, if any.
    fn cast_ray(&self, screen: Point, targets: &[HitTarget]) -> Option<HitHandle>;

    /// Where the pointer ray at `screen` meets `plane`, if it does.
    fn intersect_plane(&self, screen: Point, plane: &ReferencePlane) -> Option<DVec3>;

    /// A plane through `through`, perpendicular to the viewing direction.
    fn reference_plane(&self, through: DVec3) -> ReferencePlane;

    /// The point the camera looks at.
    fn target(&self) -> DVec3;

    /// `(longitude, latitude)` in degrees.
    fn orbit(&self) -> (f64, f64);

    /// Set the orbit. Implementations clamp latitude.
    fn set_orbit(&mut self, lon: f64, lat: f64);

    /// Vertical field of view in degrees.
    fn fov(&self) -> f64;

    /// Set the field of view. Implementations clamp to their range.
    fn set_fov(&mut self, fov_deg: f64);

    /// Return to the initial orbit and field of view.
    fn reset(&mut self);
}

/// Perspective camera orbiting `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub lon: f64,
    pub lat: f64,
    pub fov_deg: f64,
    pub distance: f64,
    pub target: DVec3,
    pub width: f64,
    pub height: f64,
    initial_fov_deg: f64,
    min_fov_deg: f64,
    max_fov_deg: f64,
    max_latitude_deg: f64,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_validated(&EditorConfig::default())
    }
}

impl OrbitCamera {
    /// A camera at the configured size and field of view.
    ///
    /// # Errors
    ///
    /// Returns the config's validation error, so the fov bounds are ordered.
    pub fn from_config(config: &EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Callers must have run [`EditorConfig::validate`].
    pub(crate) fn from_validated(config: &EditorConfig) -> Self {
        Self {
            lon: 0.0,
            lat: 0.0,
            fov_deg: config.fov_deg,
            distance: config.camera_distance,
            target: DVec3::ZERO,
            width: config.width,
            height: config.height,
            initial_fov_deg: config.fov_deg,
            min_fov_deg: config.min_fov_deg,
            max_fov_deg: config.max_fov_deg,
            max_latitude_deg: config.max_latitude_deg,
        }
    }

    /// Update the viewport size in CSS pixels.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    /// Camera position on its orbit sphere.
    #[must_use]
    pub fn eye(&self) -> DVec3 {
        let phi = (90.0 - self.lat).to_radians();
        let theta = self.lon.to_radians();
        self.target
            + DVec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()) * self.distance
    }

    #[must_use]
    pub fn view(&self) -> DMat4 {
        DMat4::look_at_rh(self.eye(), self.target, DVec3::Y)
    }

    #[must_use]
    pub fn projection(&self) -> DMat4 {
        let aspect = if self.height > 0.0 { self.width / self.height } else { 1.0 };
        DMat4::perspective_rh_gl(self.fov_deg.to_radians(), aspect, NEAR_CLIP, FAR_CLIP)
    }

    #[must_use]
    pub fn view_projection(&self) -> DMat4 {
        self.projection() * self.view()
    }

    /// The world-space ray under a screen point, or `None` for an empty viewport.
    #[must_use]
    pub fn ray_at(&self, screen: Point) -> Option<Ray> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (screen.x / self.width) * 2.0 - 1.0;
        let y = -(screen.y / self.height) * 2.0 + 1.0;
        let inv = self.view_projection().inverse();
        let near = inv.project_point3(DVec3::new(x, y, -1.0));
        let far = inv.project_point3(DVec3::new(x, y, 1.0));
        let ray = Ray::new(near, far - near);
        ray.direction.is_finite().then_some(ray)
    }

    /// Project a world point to screen space. `None` if it is behind the camera.
    #[must_use]
    pub fn world_to_screen(&self, world: DVec3) -> Option<Point> {
        let clip = self.view_projection() * DVec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Point::new((ndc.x + 1.0) * 0.5 * self.width, (1.0 - ndc.y) * 0.5 * self.height))
    }
}

impl Viewport for OrbitCamera {
    fn cast_ray(&self, screen: Point, targets: &[HitTarget]) -> Option<HitHandle> {
        self.ray_at(screen).and_then(|ray| nearest_hit(&ray, targets))
    }

    fn intersect_plane(&self, screen: Point, plane: &ReferencePlane) -> Option<DVec3> {
        self.ray_at(screen).and_then(|ray| plane.intersect(&ray))
    }

    fn reference_plane(&self, through: DVec3) -> ReferencePlane {
        ReferencePlane::new(through, self.eye() - self.target)
    }

    fn target(&self) -> DVec3 {
        self.target
    }

    fn orbit(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    fn set_orbit(&mut self, lon: f64, lat: f64) {
        self.lon = lon;
        self.lat = lat.clamp(-self.max_latitude_deg, self.max_latitude_deg);
    }

    fn fov(&self) -> f64 {
        self.fov_deg
    }

    fn set_fov(&mut self, fov_deg: f64) {
        self.fov_deg = fov_deg.clamp(self.min_fov_deg, self.max_fov_deg);
    }

    fn reset(&mut self) {
        self.lon = 0.0;
        self.lat = 0.0;
        self.fov_deg = self.initial_fov_deg;
    }
}
