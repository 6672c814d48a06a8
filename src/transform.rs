//! Transform model: position, rotation, and scale as baseline + delta channels.
//!
//! Each attribute keeps two values. `current` is what the renderer reads;
//! `baseline` is the value at the start of the active gesture. During a drag
//! the live position is always recomputed as `baseline + total_delta * level`
//! rather than by adding per-frame increments to itself, so a long drag ends
//! exactly where the pointer says it should. `commit` folds `current` into
//! `baseline` and must only run at gesture boundaries.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A transform attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attr {
    /// World-space position.
    Position,
    /// Euler XYZ rotation in radians.
    Rotation,
    /// Per-axis scale factor.
    Scale,
}

/// An attribute delta: either per-axis, or one value broadcast to all axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    /// Per-axis delta.
    Vector(DVec3),
    /// The same delta on every axis.
    Uniform(f64),
}

impl Delta {
    /// The delta as a vector, broadcasting a uniform value.
    #[must_use]
    pub fn to_vec3(self) -> DVec3 {
        match self {
            Self::Vector(v) => v,
            Self::Uniform(s) => DVec3::splat(s),
        }
    }
}

impl From<DVec3> for Delta {
    fn from(v: DVec3) -> Self {
        Self::Vector(v)
    }
}

impl From<f64> for Delta {
    fn from(s: f64) -> Self {
        Self::Uniform(s)
    }
}

/// One attribute's baseline and live value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Value at the start of the current gesture.
    pub baseline: DVec3,
    /// Live value read by the renderer.
    pub current: DVec3,
}

impl Channel {
    /// A committed channel at `value`.
    #[must_use]
    pub fn new(value: DVec3) -> Self {
        Self { baseline: value, current: value }
    }

    /// Whether the live value has moved away from the baseline.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.baseline != self.current
    }

    fn commit(&mut self) {
        self.baseline = self.current;
    }
}

/// Position, rotation, and scale of a cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Channel,
    pub rotation: Channel,
    pub scale: Channel,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DVec3::ZERO, DVec3::ONE)
    }
}

impl Transform {
    /// A committed transform with the given live values.
    #[must_use]
    pub fn new(position: DVec3, rotation: DVec3, scale: DVec3) -> Self {
        Self {
            position: Channel::new(position),
            rotation: Channel::new(rotation),
            scale: Channel::new(scale),
        }
    }

    /// A committed transform at `position` with no rotation and unit scale.
    #[must_use]
    pub fn at(position: DVec3) -> Self {
        Self::new(position, DVec3::ZERO, DVec3::ONE)
    }

    #[must_use]
    pub fn channel(&self, attr: Attr) -> &Channel {
        match attr {
            Attr::Position => &self.position,
            Attr::Rotation => &self.rotation,
            Attr::Scale => &self.scale,
        }
    }

    fn channel_mut(&mut self, attr: Attr) -> &mut Channel {
        match attr {
            Attr::Position => &mut self.position,
            Attr::Rotation => &mut self.rotation,
            Attr::Scale => &mut self.scale,
        }
    }

    /// Live value of `attr`.
    #[must_use]
    pub fn get(&self, attr: Attr) -> DVec3 {
        self.channel(attr).current
    }

    /// Add `delta` to the live value of `attr`.
    ///
    /// Used for frame-local nudges (rotation, scale, scripted changes) where
    /// the delta is already per-frame. Non-finite deltas are dropped so a
    /// degenerate input never poisons the transform with NaN.
    pub fn change_attribute(&mut self, attr: Attr, delta: impl Into<Delta>) {
        let delta = delta.into().to_vec3();
        if !delta.is_finite() {
            tracing::debug!(?attr, ?delta, "dropping non-finite attribute delta");
            return;
        }
        self.channel_mut(attr).current += delta;
    }

    /// Set the live position to `baseline + delta * level`.
    ///
    /// `delta` is the total offset since the gesture began and `level` is the
    /// cube's distance down the chain being moved (1 for the cube the gesture
    /// targets), which fans a chain out instead of translating it rigidly.
    pub fn move_to(&mut self, delta: DVec3, level: u32) {
        if !delta.is_finite() {
            tracing::debug!(?delta, "dropping non-finite move delta");
            return;
        }
        self.position.current = self.position.baseline + delta * f64::from(level);
    }

    /// Fold the live value of `attr` into its baseline.
    pub fn commit(&mut self, attr: Attr) {
        self.channel_mut(attr).commit();
    }

    /// Commit every attribute.
    pub fn commit_all(&mut self) {
        self.position.commit();
        self.rotation.commit();
        self.scale.commit();
    }

    /// Whether any attribute has uncommitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.position.is_dirty() || self.rotation.is_dirty() || self.scale.is_dirty()
    }
}
