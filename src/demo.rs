//! Scripted action player.
//!
//! A demo is a list of [`DemoAction`]s, each lasting a number of frames. The
//! player advances one frame per [`DemoPlayer::tick`] and drives the engine
//! only through its public editing API, so a script can do nothing a host
//! button could not.
//!
//! Scripts are JSON:
//!
//! ```json
//! [
//!   { "frames": 60, "type": "creation", "pos": [0, 0, 0], "size": 10 },
//!   { "frames": 10, "type": "recursion", "change": [0, 0, 12] },
//!   { "frames": 60, "type": "rotation", "depth": 1, "change": [0.1, 0, 0] },
//!   { "frames": 30, "type": "pan", "lon": 90, "lat": 0 },
//!   { "frames": 20, "type": null }
//! ]
//! ```
//!
//! Vectors may also be written as `{ "x": 0, "y": 0, "z": 12 }`. An action
//! whose `type` is null or absent waits for its frames.

#[cfg(test)]
#[path = "demo_test.rs"]
mod demo_test;

use glam::DVec3;
use rand::Rng;
use rand::rngs::StdRng;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::camera::Viewport;
use crate::cube::{CubeId, LinkVectors, Reach};
use crate::engine::EngineCore;
use crate::transform::Attr;

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("invalid demo script: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("action {index}: cube size must be positive and finite, got {size}")]
    InvalidSize { index: usize, size: f64 },
}

/// One step of a demo script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoAction {
    /// Ticks the action lasts. Zero is treated as one.
    pub frames: u32,
    #[serde(flatten)]
    pub step: DemoStep,
}

impl<'de> Deserialize<'de> for DemoAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = serde_json::Map::deserialize(deserializer)?;
        let frames = match fields.remove("frames") {
            None | Some(Value::Null) => 1,
            Some(value) => u32::deserialize(value).map_err(D::Error::custom)?,
        };
        let untyped = matches!(fields.get("type"), None | Some(Value::Null));
        let step = if untyped {
            DemoStep::Skip
        } else {
            DemoStep::deserialize(Value::Object(fields)).map_err(D::Error::custom)?
        };
        Ok(Self { frames, step })
    }
}

/// A vector written as `[x, y, z]` or `{ "x": .., "y": .., "z": .. }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum VectorForm {
    Array([f64; 3]),
    Object { x: f64, y: f64, z: f64 },
}

fn vector<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DVec3, D::Error> {
    let (VectorForm::Array([x, y, z]) | VectorForm::Object { x, y, z }) = VectorForm::deserialize(deserializer)?;
    Ok(DVec3::new(x, y, z))
}

impl DemoAction {
    #[must_use]
    pub fn new(frames: u32, step: DemoStep) -> Self {
        Self { frames, step }
    }

    fn span(&self) -> u32 {
        self.frames.max(1)
    }
}

/// What a demo action does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DemoStep {
    /// Create a root cube on the first frame.
    Creation {
        #[serde(deserialize_with = "vector")]
        pos: DVec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<f64>,
    },
    /// Orbit the camera by `lon`/`lat` degrees spread over the action.
    #[serde(alias = "pan")]
    Camera {
        #[serde(default)]
        lon: f64,
        #[serde(default)]
        lat: f64,
    },
    Position(Change),
    Rotation(Change),
    Scale(Change),
    /// Recurse the target, then spread the new chain by `change`.
    #[serde(alias = "recurse")]
    Recursion(Change),
    /// Wait.
    Skip,
}

/// Target and total change for an attribute or recursion step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(deserialize_with = "vector")]
    pub change: DVec3,
    /// Index into the demo's root cubes, in creation order.
    #[serde(default)]
    pub subject: usize,
    /// Child links to follow down from the root.
    #[serde(default)]
    pub depth: usize,
}

impl Change {
    #[must_use]
    pub fn new(change: DVec3) -> Self {
        Self { change, subject: 0, depth: 0 }
    }

    #[must_use]
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

/// Player state after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Running,
    Paused,
    Complete,
}

/// The stock demo: a cube fanned out along +z, a branch fanned along +y,
/// then random tumbles of the first two levels.
pub fn stock_program(rng: &mut impl Rng) -> Vec<DemoAction> {
    let first = tumble(rng);
    let second = tumble(rng);
    vec![
        DemoAction::new(60, DemoStep::Creation { pos: DVec3::ZERO, size: Some(10.0) }),
        DemoAction::new(10, DemoStep::Recursion(Change::new(DVec3::new(0.0, 0.0, 12.0)))),
        DemoAction::new(10, DemoStep::Recursion(Change::new(DVec3::new(0.0, 12.0, 0.0)).at_depth(1))),
        DemoAction::new(60, DemoStep::Rotation(Change::new(first).at_depth(1))),
        DemoAction::new(60, DemoStep::Rotation(Change::new(second).at_depth(2))),
    ]
}

/// A small random rotation, whole thousandths of a radian per axis.
fn tumble(rng: &mut impl Rng) -> DVec3 {
    let mut axis = || f64::from(rng.random_range(-359_i32..=360)) * 0.001;
    DVec3::new(axis(), axis(), axis())
}

/// Replays a demo script against an engine, one frame per tick.
#[derive(Debug, Default)]
pub struct DemoPlayer {
    actions: Vec<DemoAction>,
    cursor: usize,
    frame: u32,
    /// Root cubes created by the script, in creation order.
    roots: Vec<CubeId>,
    /// Cube the current action manipulates, resolved on its first frame.
    target: Option<CubeId>,
    running: bool,
    paused: bool,
}

impl DemoPlayer {
    #[must_use]
    pub fn new(actions: Vec<DemoAction>) -> Self {
        Self { actions, ..Self::default() }
    }

    /// Parse and validate a JSON script.
    ///
    /// # Errors
    ///
    /// Returns [`DemoError::Parse`] on malformed JSON and
    /// [`DemoError::InvalidSize`] for a creation with a bad size.
    pub fn from_json(json: &str) -> Result<Self, DemoError> {
        let actions: Vec<DemoAction> = serde_json::from_str(json)?;
        for (index, action) in actions.iter().enumerate() {
            if let DemoStep::Creation { size: Some(size), .. } = action.step {
                if !(size.is_finite() && size > 0.0) {
                    return Err(DemoError::InvalidSize { index, size });
                }
            }
        }
        Ok(Self::new(actions))
    }

    /// Replace the script with a freshly randomized stock program.
    pub fn generate(&mut self, rng: &mut impl Rng) {
        self.actions = stock_program(rng);
    }

    #[must_use]
    pub fn actions(&self) -> &[DemoAction] {
        &self.actions
    }

    /// Root cubes the script has created so far.
    #[must_use]
    pub fn roots(&self) -> &[CubeId] {
        &self.roots
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Reset, optionally regenerate the program, and start playing.
    pub fn start<V: Viewport>(&mut self, engine: &mut EngineCore<V>, regen: Option<&mut StdRng>) {
        if let Some(rng) = regen {
            self.generate(rng);
        }
        self.reset(engine);
        self.running = true;
        tracing::info!(actions = self.actions.len(), "demo started");
    }

    /// Remove every cube the script created and reset the camera.
    pub fn reset<V: Viewport>(&mut self, engine: &mut EngineCore<V>) {
        for root in std::mem::take(&mut self.roots) {
            engine.remove_cube(&root);
        }
        engine.reset_camera();
        self.cursor = 0;
        self.frame = 0;
        self.target = None;
        self.running = false;
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    /// Advance one frame.
    pub fn tick<V: Viewport>(&mut self, engine: &mut EngineCore<V>) -> PlayerStatus {
        if !self.running {
            return PlayerStatus::Complete;
        }
        if self.paused {
            return PlayerStatus::Paused;
        }
        let Some(action) = self.actions.get(self.cursor).cloned() else {
            return self.finish();
        };

        if self.frame == 0 {
            self.begin(self.cursor, &action, engine);
        }
        self.apply_frame(&action, engine);
        self.frame += 1;

        if self.frame >= action.span() {
            self.end(&action, engine);
            self.cursor += 1;
            self.frame = 0;
            self.target = None;
            if self.cursor >= self.actions.len() {
                return self.finish();
            }
        }
        PlayerStatus::Running
    }

    fn finish(&mut self) -> PlayerStatus {
        if self.running {
            tracing::info!(roots = self.roots.len(), "demo complete");
        }
        self.running = false;
        PlayerStatus::Complete
    }

    /// Root `subject`, then `depth` child links down.
    fn resolve<V: Viewport>(&self, engine: &EngineCore<V>, change: &Change) -> Option<CubeId> {
        let root = self.roots.get(change.subject)?;
        engine.registry.descend(root, change.depth)
    }

    fn begin<V: Viewport>(&mut self, index: usize, action: &DemoAction, engine: &mut EngineCore<V>) {
        tracing::debug!(index, frames = action.frames, "demo action");
        match &action.step {
            DemoStep::Creation { pos, size } => {
                let size = size.unwrap_or(engine.config.cube_size);
                if let Some(id) = engine.create_cube(size, *pos) {
                    self.roots.push(id);
                }
            }
            DemoStep::Position(change) | DemoStep::Rotation(change) | DemoStep::Scale(change) => {
                self.target = self.resolve(engine, change);
            }
            DemoStep::Recursion(change) => {
                self.target = self
                    .resolve(engine, change)
                    .and_then(|id| engine.recurse_cube(&id, &LinkVectors::default()).first().copied());
            }
            DemoStep::Camera { .. } | DemoStep::Skip => {}
        }
        if self.target.is_none() && step_needs_target(&action.step) {
            tracing::debug!(index, "demo target missing; step skipped");
        }
    }

    fn apply_frame<V: Viewport>(&self, action: &DemoAction, engine: &mut EngineCore<V>) {
        let n = f64::from(action.span());
        match &action.step {
            DemoStep::Camera { lon, lat } => engine.orbit_by(lon / n, lat / n),
            DemoStep::Position(c) => self.nudge(engine, Attr::Position, c.change / n, Reach::SelfOnly),
            DemoStep::Rotation(c) => self.nudge(engine, Attr::Rotation, c.change / n, Reach::SelfOnly),
            DemoStep::Scale(c) => self.nudge(engine, Attr::Scale, c.change / n, Reach::SelfOnly),
            DemoStep::Recursion(c) => self.nudge(engine, Attr::Position, c.change / n, Reach::Chain),
            DemoStep::Creation { .. } | DemoStep::Skip => {}
        }
    }

    fn nudge<V: Viewport>(&self, engine: &mut EngineCore<V>, attr: Attr, delta: DVec3, reach: Reach) {
        if let Some(id) = self.target {
            engine.change_attribute(&id, attr, delta, reach);
        }
    }

    fn end<V: Viewport>(&self, action: &DemoAction, engine: &mut EngineCore<V>) {
        if step_needs_target(&action.step) {
            if let Some(id) = self.target {
                engine.commit(&id);
            }
        }
    }
}

fn step_needs_target(step: &DemoStep) -> bool {
    matches!(step, DemoStep::Position(_) | DemoStep::Rotation(_) | DemoStep::Scale(_) | DemoStep::Recursion(_))
}
