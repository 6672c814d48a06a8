//! Rays, reference planes, and hit-testing against cube geometry.
//!
//! Cubes are tested as oriented boxes: the ray is carried into each cube's
//! local space (the unit cube `[-0.5, 0.5]^3`) and clipped with the slab
//! method. The ray parameter survives the change of space, so distances from
//! different cubes compare directly.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use glam::{DAffine3, DVec3};

use crate::cube::HitHandle;

const PARALLEL_EPSILON: f64 = 1e-12;

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Ray {
    /// A ray from `origin` along `direction` (normalized here).
    #[must_use]
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    #[must_use]
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}

/// Hit-testable geometry of one cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTarget {
    pub handle: HitHandle,
    /// Maps the unit cube into world space.
    pub model: DAffine3,
}

/// The invisible plane that turns 2D pointer motion into world-space deltas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePlane {
    pub origin: DVec3,
    /// Unit normal, facing the camera.
    pub normal: DVec3,
}

impl ReferencePlane {
    #[must_use]
    pub fn new(origin: DVec3, normal: DVec3) -> Self {
        Self { origin, normal: normal.normalize_or_zero() }
    }

    /// Where `ray` crosses the plane, if it does so in front of its origin.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<DVec3> {
        let denom = self.normal.dot(ray.direction);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = self.normal.dot(self.origin - ray.origin) / denom;
        (t >= 0.0).then(|| ray.point_at(t))
    }
}

/// Distance along `ray` to the first point inside `target`, or `None` on a miss.
///
/// A ray starting inside the cube hits at its exit point.
#[must_use]
pub fn ray_target_distance(ray: &Ray, target: &HitTarget) -> Option<f64> {
    if !target.model.is_finite() || target.model.matrix3.determinant().abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv = target.model.inverse();
    let origin = inv.transform_point3(ray.origin);
    let dir = inv.transform_vector3(ray.direction);

    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;
    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < PARALLEL_EPSILON {
            if !(-0.5..=0.5).contains(&o) {
                return None;
            }
            continue;
        }
        let t1 = (-0.5 - o) / d;
        let t2 = (0.5 - o) / d;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
    }

    if t_near <= t_far && t_far >= 0.0 {
        Some(if t_near >= 0.0 { t_near } else { t_far })
    } else {
        None
    }
}

/// Handle of the closest target hit by `ray`.
#[must_use]
pub fn nearest_hit(ray: &Ray, targets: &[HitTarget]) -> Option<HitHandle> {
    targets
        .iter()
        .filter_map(|t| ray_target_distance(ray, t).map(|d| (d, t.handle)))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, handle)| handle)
}
