//! Per-viewport configuration.
//!
//! Everything the gesture router, camera, and registry would otherwise read
//! from shared mutable globals lives here, and is handed to
//! [`crate::engine::EngineCore::with_config`] at construction. Hosts can
//! override any subset of fields from JSON; missing fields keep their defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    CAMERA_DISTANCE, DEFAULT_CUBE_SIZE, DEFAULT_FOV_DEG, DEFAULT_RECURSION_LIMIT, FOV_WHEEL_STEP, MAX_FOV_DEG,
    MAX_LATITUDE_DEG, MIN_FOV_DEG, ORBIT_SPEED, ROTATE_POINTER_SPEED, ROTATE_SPEED, SCALE_STEP, WHEEL_SCALE_STEP,
};
use crate::cube::{LinkVectors, Reach};
use crate::registry::ManipulationSpeeds;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("recursion limit must be at least 1")]
    RecursionLimit,
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("fov range is empty: min {min} > max {max}")]
    FovRange { min: f64, max: f64 },
    #[error("fov {fov} is outside [{min}, {max}]")]
    FovOutOfRange { fov: f64, min: f64, max: f64 },
}

/// Configuration for one editor viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Viewport width in CSS pixels.
    pub width: f64,
    /// Viewport height in CSS pixels.
    pub height: f64,
    /// Initial vertical field of view in degrees.
    pub fov_deg: f64,
    pub min_fov_deg: f64,
    pub max_fov_deg: f64,
    /// Degrees of fov per pixel of wheel motion.
    pub fov_wheel_step: f64,
    /// Distance from the camera to its orbit target.
    pub camera_distance: f64,
    /// Degrees of orbit per pixel of camera drag.
    pub orbit_speed: f64,
    pub max_latitude_deg: f64,
    /// Edge length of cubes created by double-click.
    pub cube_size: f64,
    /// Clones produced by one full recursion.
    pub recursion_limit: usize,
    pub rotate_speed: f64,
    pub rotate_pointer_speed: f64,
    pub scale_step: f64,
    /// Scale factor per pixel of wheel motion.
    pub wheel_scale_step: f64,
    /// Whether pointer rotation reaches down the selected cube's chain.
    pub rotate_reach: Reach,
    /// Whether wheel scaling reaches down the selected cube's chain.
    pub scale_reach: Reach,
    /// Offsets applied to clones made by the duplicate gesture.
    pub links: LinkVectors,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            fov_deg: DEFAULT_FOV_DEG,
            min_fov_deg: MIN_FOV_DEG,
            max_fov_deg: MAX_FOV_DEG,
            fov_wheel_step: FOV_WHEEL_STEP,
            camera_distance: CAMERA_DISTANCE,
            orbit_speed: ORBIT_SPEED,
            max_latitude_deg: MAX_LATITUDE_DEG,
            cube_size: DEFAULT_CUBE_SIZE,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            rotate_speed: ROTATE_SPEED,
            rotate_pointer_speed: ROTATE_POINTER_SPEED,
            scale_step: SCALE_STEP,
            wheel_scale_step: WHEEL_SCALE_STEP,
            rotate_reach: Reach::SelfOnly,
            scale_reach: Reach::Chain,
            links: LinkVectors::default(),
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed JSON, or any validation
    /// error from [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recursion_limit == 0 {
            return Err(ConfigError::RecursionLimit);
        }
        for (field, value) in [
            ("cube_size", self.cube_size),
            ("camera_distance", self.camera_distance),
            ("max_latitude_deg", self.max_latitude_deg),
            ("min_fov_deg", self.min_fov_deg),
            ("max_fov_deg", self.max_fov_deg),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.min_fov_deg > self.max_fov_deg {
            return Err(ConfigError::FovRange { min: self.min_fov_deg, max: self.max_fov_deg });
        }
        if !(self.min_fov_deg..=self.max_fov_deg).contains(&self.fov_deg) {
            return Err(ConfigError::FovOutOfRange {
                fov: self.fov_deg,
                min: self.min_fov_deg,
                max: self.max_fov_deg,
            });
        }
        Ok(())
    }

    /// Rotate/scale gains for the registry.
    #[must_use]
    pub fn speeds(&self) -> ManipulationSpeeds {
        ManipulationSpeeds {
            rotate: self.rotate_speed,
            rotate_pointer: self.rotate_pointer_speed,
            scale_step: self.scale_step,
        }
    }
}
