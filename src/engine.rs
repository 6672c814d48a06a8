//! Gesture router and the public editing API.
//!
//! [`EngineCore`] holds everything that does not depend on the browser: the
//! cube registry, the viewport, the input state machine, and the config. Host
//! code feeds it pointer, wheel, and key events and processes the returned
//! [`Action`]s. Membership changes made through the direct API (scripts,
//! host buttons) are queued and collected with [`EngineCore::drain_actions`].

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashSet;

use glam::DVec3;
use serde::Serialize;

use crate::camera::{OrbitCamera, Point, Viewport};
use crate::config::{ConfigError, EditorConfig};
use crate::cube::{CubeId, CubeSnapshot, LinkVectors, Reach};
use crate::input::{Button, Gesture, GestureMode, InputState, Key, Modifiers, WheelDelta};
use crate::registry::{CubeRegistry, SceneEvent};
use crate::transform::{Attr, Delta, Transform};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Action {
    /// A cube joined the scene; attach its visual before the next frame.
    CubeAdded(CubeSnapshot),
    /// A cube left the scene; detach its visual.
    CubeRemoved { id: CubeId },
    SetCursor(String),
    RenderNeeded,
}

/// Core engine state: all logic that doesn't depend on the canvas element.
///
/// Generic over the [`Viewport`] so tests can drive it with a deterministic
/// projection.
pub struct EngineCore<V = OrbitCamera> {
    pub registry: CubeRegistry,
    pub viewport: V,
    pub input: InputState,
    pub config: EditorConfig,
    hovered: Option<CubeId>,
}

impl Default for EngineCore<OrbitCamera> {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self::assemble(OrbitCamera::from_validated(&config), config)
    }
}

impl EngineCore<OrbitCamera> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with an orbit camera built from `config`.
    ///
    /// # Errors
    ///
    /// Returns the config's validation error.
    pub fn with_config(config: EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(OrbitCamera::from_validated(&config), config))
    }
}

impl<V: Viewport> EngineCore<V> {
    /// An engine driving a caller-supplied viewport.
    ///
    /// # Errors
    ///
    /// Returns the config's validation error.
    pub fn with_viewport(viewport: V, config: EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(viewport, config))
    }

    fn assemble(viewport: V, config: EditorConfig) -> Self {
        Self {
            registry: CubeRegistry::new(config.recursion_limit, config.speeds()),
            viewport,
            input: InputState::Idle,
            config,
            hovered: None,
        }
    }

    // --- Scene edits ---

    /// Add a cube of edge length `size` at `position`.
    ///
    /// Returns `None` (and adds nothing) unless `size` is positive and both
    /// inputs are finite.
    pub fn create_cube(&mut self, size: f64, position: DVec3) -> Option<CubeId> {
        if !(size.is_finite() && size > 0.0 && position.is_finite()) {
            tracing::debug!(size, ?position, "cube rejected");
            return None;
        }
        let cube = self.registry.spawn(size, Transform::at(position));
        let id = self.registry.add(cube);
        tracing::debug!(%id, size, "cube created");
        Some(id)
    }

    /// Select a cube, deselecting its relatives. Returns `false` for unknown ids.
    pub fn select_cube(&mut self, id: &CubeId) -> bool {
        self.registry.select(id)
    }

    pub fn deselect_all(&mut self) {
        self.registry.deselect_all();
    }

    /// Move the selection (and its chains) by `delta` and commit.
    pub fn move_selection(&mut self, delta: DVec3) {
        self.registry.move_all(delta);
        self.registry.commit_all();
    }

    /// Rotate the selection as one drag step of world delta `delta` and
    /// pointer motion `(px, py)`, then commit.
    pub fn rotate_selection(&mut self, delta: DVec3, px: f64, py: f64) {
        self.registry.rotate_all(delta, Point::new(px, py), self.config.rotate_reach);
        self.registry.commit_all();
    }

    /// Scale the selection by `factor` steps and commit.
    pub fn scale_selection(&mut self, factor: f64) {
        self.registry.scale_all(factor, self.config.scale_reach);
        self.registry.commit_all();
    }

    /// Append one clone to each selected chain and select the clones instead.
    pub fn duplicate_selection(&mut self) -> Vec<CubeId> {
        self.registry.commit_all();
        let links = self.config.links;
        let created = self.registry.extend_all(&links);
        self.registry.deselect_all();
        for id in &created {
            self.registry.select(id);
        }
        tracing::debug!(created = created.len(), "selection duplicated");
        created
    }

    /// Add `delta` (scaled by chain level) to `attr` without committing.
    pub fn change_attribute(&mut self, id: &CubeId, attr: Attr, delta: impl Into<Delta>, reach: Reach) {
        self.registry.change_attribute(id, attr, delta.into(), reach);
    }

    /// Grow a full chain of clones from `id`.
    pub fn recurse_cube(&mut self, id: &CubeId, links: &LinkVectors) -> Vec<CubeId> {
        self.registry.recurse(id, 0, links)
    }

    /// Remove a cube and its subtree.
    pub fn remove_cube(&mut self, id: &CubeId) -> Vec<CubeId> {
        let removed = self.registry.remove(id);
        if self.hovered.is_some_and(|h| removed.contains(&h)) {
            self.hovered = None;
        }
        removed
    }

    /// Remove every selected cube and its subtree.
    pub fn delete_selection(&mut self) -> Vec<CubeId> {
        let doomed = self.registry.selection().ids().to_vec();
        doomed.iter().flat_map(|id| self.remove_cube(id)).collect()
    }

    /// Commit every attribute of `id` and its subtree.
    pub fn commit(&mut self, id: &CubeId) {
        self.registry.commit(id);
    }

    // --- Camera ---

    /// Orbit the camera by a relative amount in degrees.
    pub fn orbit_by(&mut self, dlon: f64, dlat: f64) {
        let (lon, lat) = self.viewport.orbit();
        self.viewport.set_orbit(lon + dlon, lat + dlat);
    }

    pub fn reset_camera(&mut self) {
        self.viewport.reset();
    }

    // --- Queries ---

    #[must_use]
    pub fn cube(&self, id: &CubeId) -> Option<CubeSnapshot> {
        self.registry.get(id).map(crate::cube::Cube::snapshot)
    }

    /// Selected cube ids in selection order.
    #[must_use]
    pub fn selection(&self) -> &[CubeId] {
        self.registry.selection().ids()
    }

    #[must_use]
    pub fn hovered(&self) -> Option<CubeId> {
        self.hovered
    }

    /// Membership actions queued by edits since the last drain.
    ///
    /// A cube added and removed within one batch was never seen by the host,
    /// so both of its events are dropped.
    pub fn drain_actions(&mut self) -> Vec<Action> {
        let events = self.registry.drain_events();
        let transient: HashSet<CubeId> = events
            .iter()
            .filter_map(|event| match event {
                SceneEvent::Added(id) if !self.registry.contains(id) => Some(*id),
                _ => None,
            })
            .collect();
        events
            .into_iter()
            .filter_map(|event| match event {
                SceneEvent::Added(id) => self.registry.get(&id).map(|c| Action::CubeAdded(c.snapshot())),
                SceneEvent::Removed(id) if transient.contains(&id) => None,
                SceneEvent::Removed(id) => Some(Action::CubeRemoved { id }),
            })
            .collect()
    }

    /// Membership actions first, so the host attaches visuals before rendering.
    fn finish(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut out = self.drain_actions();
        out.extend(actions);
        out
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.input {
            InputState::Idle => {
                self.update_hover(screen, &mut actions);
                self.start_gesture(screen, button, modifiers, &mut actions);
            }
            InputState::ObjectDrag(mut gesture) => {
                if button != Button::Middle {
                    gesture.set_button(button, true);
                    if gesture.both_down() {
                        self.trigger_duplicate(&mut gesture);
                        actions.push(Action::RenderNeeded);
                    }
                }
                self.input = InputState::ObjectDrag(gesture);
            }
            InputState::CameraDrag { .. } => {
                tracing::debug!(?button, "button down during camera drag ignored");
            }
        }
        self.finish(actions)
    }

    fn start_gesture(&mut self, screen: Point, button: Button, modifiers: Modifiers, actions: &mut Vec<Action>) {
        match (button, self.hovered) {
            (Button::Primary, None) => {
                self.registry.deselect_all();
                let (start_lon, start_lat) = self.viewport.orbit();
                self.input = InputState::CameraDrag { start_screen: screen, start_lon, start_lat };
                actions.push(Action::RenderNeeded);
            }
            (Button::Primary, Some(id)) => {
                self.registry.select(&id);
                self.begin_drag(GestureMode::Move, button, screen, id);
                if modifiers.ctrl || modifiers.meta {
                    if let InputState::ObjectDrag(mut gesture) = self.input {
                        self.trigger_duplicate(&mut gesture);
                        self.input = InputState::ObjectDrag(gesture);
                    }
                }
                actions.push(Action::RenderNeeded);
            }
            (Button::Secondary, Some(id)) => {
                self.registry.select(&id);
                self.begin_drag(GestureMode::Rotate, button, screen, id);
                actions.push(Action::RenderNeeded);
            }
            (Button::Secondary, None) => match self.registry.selection().ids().first().copied() {
                Some(anchor) => self.begin_drag(GestureMode::Rotate, button, screen, anchor),
                None => tracing::debug!("rotate with empty selection ignored"),
            },
            (Button::Middle, _) => {}
        }
    }

    /// Enter an object drag on a plane through `anchor`, facing the camera.
    fn begin_drag(&mut self, mode: GestureMode, button: Button, screen: Point, anchor: CubeId) {
        let through = self
            .registry
            .get(&anchor)
            .map_or_else(|| self.viewport.target(), |c| c.transform.get(Attr::Position));
        let plane = self.viewport.reference_plane(through);
        let mut gesture = Gesture::new(mode, button, screen, plane);
        gesture.plane_offset = self.viewport.intersect_plane(screen, &plane).map(|hit| hit - plane.origin);
        self.input = InputState::ObjectDrag(gesture);
    }

    /// Commit, extend every selected chain by one clone, and select the clones.
    fn trigger_duplicate(&mut self, gesture: &mut Gesture) {
        if gesture.recursion_triggered {
            tracing::debug!("duplicate already fired in this gesture");
            return;
        }
        self.duplicate_selection();
        gesture.rebase();
        gesture.mode = GestureMode::Duplicate;
        gesture.recursion_triggered = true;
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.input {
            InputState::Idle => {}
            InputState::CameraDrag { start_screen, start_lon, start_lat } => {
                let speed = self.config.orbit_speed;
                let lon = (screen.x - start_screen.x) * speed + start_lon;
                let lat = (screen.y - start_screen.y) * speed + start_lat;
                self.viewport.set_orbit(lon, lat);
                actions.push(Action::RenderNeeded);
            }
            InputState::ObjectDrag(mut gesture) => {
                let pointer = Point::new(screen.x - gesture.last_pointer.x, screen.y - gesture.last_pointer.y);
                gesture.last_pointer = screen;
                if let Some(hit) = self.viewport.intersect_plane(screen, &gesture.plane) {
                    let incremental = gesture.advance(hit);
                    match gesture.mode {
                        GestureMode::Move | GestureMode::Duplicate => self.registry.move_all(gesture.accumulated),
                        GestureMode::Rotate => {
                            self.registry.rotate_all(incremental, pointer, self.config.rotate_reach);
                        }
                    }
                    actions.push(Action::RenderNeeded);
                }
                self.input = InputState::ObjectDrag(gesture);
            }
        }
        self.update_hover(screen, &mut actions);
        self.finish(actions)
    }

    pub fn on_pointer_up(&mut self, _screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.input {
            InputState::Idle => {}
            InputState::CameraDrag { .. } => {
                if button == Button::Primary {
                    self.input = InputState::Idle;
                }
            }
            InputState::ObjectDrag(gesture) if button == gesture.initiator => {
                self.registry.commit_all();
                self.input = InputState::Idle;
                actions.push(Action::RenderNeeded);
            }
            InputState::ObjectDrag(mut gesture) => {
                if button != Button::Middle {
                    self.registry.commit_all();
                    self.registry.deselect_all();
                    gesture.set_button(button, false);
                    gesture.recursion_triggered = false;
                    gesture.reset_accumulators();
                    actions.push(Action::RenderNeeded);
                }
                self.input = InputState::ObjectDrag(gesture);
            }
        }
        self.finish(actions)
    }

    /// Pointer capture was lost: end whatever gesture is active as if its
    /// initiating button had been released.
    pub fn on_pointer_cancel(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        match self.input {
            InputState::Idle => {}
            InputState::CameraDrag { .. } => self.input = InputState::Idle,
            InputState::ObjectDrag(_) => {
                self.registry.commit_all();
                self.input = InputState::Idle;
                actions.push(Action::RenderNeeded);
            }
        }
        self.finish(actions)
    }

    pub fn on_wheel(&mut self, _screen: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if self.registry.selection().is_empty() {
            let fov = self.viewport.fov() + delta.dy * self.config.fov_wheel_step;
            self.viewport.set_fov(fov);
        } else {
            self.registry.scale_all(-delta.dy * self.config.wheel_scale_step, self.config.scale_reach);
            self.registry.commit_attribute(Attr::Scale);
        }
        self.finish(vec![Action::RenderNeeded])
    }

    pub fn on_key_down(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        match key.0.as_str() {
            "Delete" | "Backspace" => {
                let removed = self.delete_selection();
                tracing::debug!(removed = removed.len(), "selection deleted");
                actions.push(Action::RenderNeeded);
            }
            "Escape" => {
                self.registry.deselect_all();
                actions.push(Action::RenderNeeded);
            }
            "Control" | "Meta" => {
                if let InputState::ObjectDrag(mut gesture) = self.input {
                    self.trigger_duplicate(&mut gesture);
                    self.input = InputState::ObjectDrag(gesture);
                    actions.push(Action::RenderNeeded);
                }
            }
            _ => {}
        }
        self.finish(actions)
    }

    /// Create a cube where the pointer meets the plane through the camera
    /// target, unless the pointer is over an existing cube.
    pub fn on_double_click(&mut self, screen: Point) -> Vec<Action> {
        let mut actions = Vec::new();
        let targets = self.registry.hit_targets();
        if self.viewport.cast_ray(screen, &targets).is_some() {
            return self.finish(actions);
        }
        let plane = self.viewport.reference_plane(self.viewport.target());
        let position = self.viewport.intersect_plane(screen, &plane);
        if position.and_then(|p| self.create_cube(self.config.cube_size, p)).is_some() {
            self.update_hover(screen, &mut actions);
            actions.push(Action::RenderNeeded);
        }
        self.finish(actions)
    }

    /// Re-cast the pointer ray and move the hover flag if the target changed.
    fn update_hover(&mut self, screen: Point, actions: &mut Vec<Action>) {
        let targets = self.registry.hit_targets();
        let hit = self.registry.find_by_intersection(self.viewport.cast_ray(screen, &targets));
        if hit == self.hovered {
            return;
        }
        if let Some(prev) = self.hovered {
            self.registry.hover(&prev, false);
        }
        if let Some(id) = hit {
            self.registry.hover(&id, true);
        }
        self.hovered = hit;
        let cursor = if hit.is_some() { "move" } else { "auto" };
        actions.push(Action::SetCursor(cursor.to_owned()));
        actions.push(Action::RenderNeeded);
    }
}
