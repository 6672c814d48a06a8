//! Cube records: identity, transform, hover/selection state, and chain links.
//!
//! A cube does not own other cubes directly. Parent and child links are plain
//! ids into the [`crate::registry::CubeRegistry`] arena, so a chain can never
//! form an ownership cycle and walking it is a simple id lookup. Operations
//! that must see more than one cube (chain moves, the selection invariant,
//! recursion) live on the registry; this module covers single-cube state.

#[cfg(test)]
#[path = "cube_test.rs"]
mod cube_test;

use glam::{DAffine3, DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{HOVER_COLOR, IDLE_COLOR, SELECTED_COLOR};
use crate::transform::{Attr, Transform};

/// Unique identifier for a cube.
pub type CubeId = Uuid;

/// Renderer-side identity of a cube's hit-test geometry.
pub type HitHandle = u64;

/// How far an operation reaches down a cube chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reach {
    /// Only the targeted cube.
    #[default]
    SelfOnly,
    /// The targeted cube and every descendant, each at its chain level.
    Chain,
}

/// Offsets that seed a clone's transform from the cube it was cloned from.
///
/// Position and rotation are added; scale is multiplied per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkVectors {
    pub position: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Default for LinkVectors {
    fn default() -> Self {
        Self { position: DVec3::ZERO, rotation: DVec3::ZERO, scale: DVec3::ONE }
    }
}

/// A cube in the scene.
#[derive(Debug, Clone)]
pub struct Cube {
    id: CubeId,
    handle: HitHandle,
    size: f64,
    pub transform: Transform,
    hovered: bool,
    selected: bool,
    color: u32,
    parent: Option<CubeId>,
    children: Vec<CubeId>,
}

impl Cube {
    /// A new, unlinked cube. `handle` is assigned by the registry.
    #[must_use]
    pub fn new(handle: HitHandle, size: f64, transform: Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            size,
            transform,
            hovered: false,
            selected: false,
            color: IDLE_COLOR,
            parent: None,
            children: Vec::new(),
        }
    }

    /// A clone of this cube's shape: new identity, same size, transform seeded
    /// from this cube's live values offset by `links`. The clone is unlinked
    /// and carries no hover or selection state.
    #[must_use]
    pub fn clone_linked(&self, handle: HitHandle, links: &LinkVectors) -> Self {
        let transform = Transform::new(
            self.transform.get(Attr::Position) + links.position,
            self.transform.get(Attr::Rotation) + links.rotation,
            self.transform.get(Attr::Scale) * links.scale,
        );
        Self::new(handle, self.size, transform)
    }

    // --- Identity and links ---

    #[must_use]
    pub fn id(&self) -> CubeId {
        self.id
    }

    #[must_use]
    pub fn handle(&self) -> HitHandle {
        self.handle
    }

    #[must_use]
    pub fn size(&self) -> f64 {
        self.size
    }

    #[must_use]
    pub fn parent(&self) -> Option<CubeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[CubeId] {
        &self.children
    }

    /// The chain continuation: the most recently attached child.
    #[must_use]
    pub fn child(&self) -> Option<CubeId> {
        self.children.last().copied()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<CubeId>) {
        self.parent = parent;
    }

    pub(crate) fn push_child(&mut self, child: CubeId) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: CubeId) {
        self.children.retain(|c| *c != child);
    }

    // --- Hover and selection ---

    #[must_use]
    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Wireframe color the renderer should draw.
    #[must_use]
    pub fn color(&self) -> u32 {
        self.color
    }

    /// Set the hover flag. The selection color wins over the hover color.
    pub fn hover(&mut self, on: bool) {
        self.hovered = on;
        if !self.selected {
            self.color = if on { HOVER_COLOR } else { IDLE_COLOR };
        }
    }

    /// Set the selection flag and recolor.
    ///
    /// This only touches this cube. The chain rule (no selected ancestor or
    /// descendant) is enforced by [`crate::registry::CubeRegistry::select`].
    pub fn set_selected(&mut self, on: bool) -> &mut Self {
        self.selected = on;
        if on {
            self.color = SELECTED_COLOR;
        } else {
            self.hover(self.hovered);
        }
        self
    }

    // --- Geometry ---

    /// Live transform as an affine map from the unit cube `[-0.5, 0.5]^3`
    /// into world space.
    #[must_use]
    pub fn model_matrix(&self) -> DAffine3 {
        let rotation = self.transform.get(Attr::Rotation);
        DAffine3::from_scale_rotation_translation(
            self.transform.get(Attr::Scale) * self.size,
            DQuat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z),
            self.transform.get(Attr::Position),
        )
    }

    /// The eight world-space corners, ordered by bit pattern `(x, y, z)`.
    #[must_use]
    pub fn world_corners(&self) -> [DVec3; 8] {
        let m = self.model_matrix();
        std::array::from_fn(|i| {
            let local = DVec3::new(
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            );
            m.transform_point3(local)
        })
    }

    /// A read-only copy of the state hosts and scripts care about.
    #[must_use]
    pub fn snapshot(&self) -> CubeSnapshot {
        CubeSnapshot {
            id: self.id,
            size: self.size,
            position: self.transform.get(Attr::Position),
            rotation: self.transform.get(Attr::Rotation),
            scale: self.transform.get(Attr::Scale),
            color: self.color,
            hovered: self.hovered,
            selected: self.selected,
            parent_id: self.parent,
            child_id: self.child(),
        }
    }
}

/// Orientation change for a rotate drag.
///
/// An approximate, arcball-like mapping: vertical drag motion tilts the cube
/// about the horizontal axis perpendicular to the drag's ground direction,
/// and horizontal pointer motion yaws it. When the drag has no ground
/// component (`|d.x| + |d.z| == 0`) the tilt terms are zero.
#[must_use]
pub fn rotation_delta(delta: DVec3, pointer_dx: f64, speed: f64, pointer_speed: f64) -> DVec3 {
    let ground = delta.x.abs() + delta.z.abs();
    let tilt = delta.y.abs() * speed;
    let (x, z) = if ground > 0.0 {
        (tilt * (delta.z / ground), -tilt * (delta.x / ground))
    } else {
        (0.0, 0.0)
    };
    DVec3::new(x, pointer_dx * pointer_speed, z)
}

/// Read-only cube state for hosts and scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeSnapshot {
    pub id: CubeId,
    pub size: f64,
    pub position: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
    pub color: u32,
    pub hovered: bool,
    pub selected: bool,
    pub parent_id: Option<CubeId>,
    pub child_id: Option<CubeId>,
}
