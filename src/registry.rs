//! Cube registry: the arena of live cubes, the selection set, and chain operations.
//!
//! The registry is the sole authority for scene membership. Every add and
//! remove queues a [`SceneEvent`] which the engine hands to the host as an
//! [`crate::engine::Action`]; the host renderer attaches or detaches the visual
//! object before its next frame. It also keeps the reverse index from the
//! renderer's [`HitHandle`]s back to [`CubeId`]s, since the ray caster knows
//! nothing about cubes.
//!
//! Chain operations (moves that fan out, recursion, the selection rule that a
//! cube and its relatives are never selected together) need more than one
//! cube at a time, so they are implemented here against the arena.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::{HashMap, HashSet};

use glam::DVec3;

use crate::camera::Point;
use crate::consts::{DEFAULT_RECURSION_LIMIT, ROTATE_POINTER_SPEED, ROTATE_SPEED, SCALE_STEP};
use crate::cube::{Cube, CubeId, HitHandle, LinkVectors, Reach, rotation_delta};
use crate::hit::HitTarget;
use crate::transform::{Attr, Delta, Transform};

/// Membership notification for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    Added(CubeId),
    Removed(CubeId),
}

/// Insertion-ordered set of cube ids.
///
/// Used both for registry membership and for the selection.
#[derive(Debug, Clone, Default)]
pub struct CubeSet {
    order: Vec<CubeId>,
    members: HashSet<CubeId>,
}

impl CubeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: CubeId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove `id`. Returns `false` if it was not present.
    pub fn remove(&mut self, id: &CubeId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|c| c != id);
        true
    }

    #[must_use]
    pub fn contains(&self, id: &CubeId) -> bool {
        self.members.contains(id)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[CubeId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &CubeId> {
        self.order.iter()
    }
}

/// Speeds used by chain rotate and scale operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationSpeeds {
    pub rotate: f64,
    pub rotate_pointer: f64,
    pub scale_step: f64,
}

impl Default for ManipulationSpeeds {
    fn default() -> Self {
        Self { rotate: ROTATE_SPEED, rotate_pointer: ROTATE_POINTER_SPEED, scale_step: SCALE_STEP }
    }
}

/// The set of live cubes.
#[derive(Debug)]
pub struct CubeRegistry {
    cubes: HashMap<CubeId, Cube>,
    members: CubeSet,
    selection: CubeSet,
    by_handle: HashMap<HitHandle, CubeId>,
    next_handle: HitHandle,
    events: Vec<SceneEvent>,
    recursion_limit: usize,
    speeds: ManipulationSpeeds,
}

impl Default for CubeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RECURSION_LIMIT, ManipulationSpeeds::default())
    }
}

impl CubeRegistry {
    #[must_use]
    pub fn new(recursion_limit: usize, speeds: ManipulationSpeeds) -> Self {
        Self {
            cubes: HashMap::new(),
            members: CubeSet::new(),
            selection: CubeSet::new(),
            by_handle: HashMap::new(),
            next_handle: 1,
            events: Vec::new(),
            recursion_limit,
            speeds,
        }
    }

    #[must_use]
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    // =============================================================
    // Membership
    // =============================================================

    /// Build a cube with a fresh hit handle. It is not a member until added.
    pub fn spawn(&mut self, size: f64, transform: Transform) -> Cube {
        let handle = self.take_handle();
        Cube::new(handle, size, transform)
    }

    fn take_handle(&mut self) -> HitHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Insert a cube and queue an `Added` event. Re-adding a member is a no-op.
    pub fn add(&mut self, cube: Cube) -> CubeId {
        let id = cube.id();
        if self.members.insert(id) {
            self.by_handle.insert(cube.handle(), id);
            self.cubes.insert(id, cube);
            self.events.push(SceneEvent::Added(id));
        }
        id
    }

    /// Insert several cubes in order.
    pub fn add_many(&mut self, cubes: Vec<Cube>) -> Vec<CubeId> {
        cubes.into_iter().map(|c| self.add(c)).collect()
    }

    /// Remove a cube together with its subtree, unlinking it from its parent.
    ///
    /// Returns the removed ids, the requested cube first. Unknown ids remove nothing.
    pub fn remove(&mut self, id: &CubeId) -> Vec<CubeId> {
        if !self.members.contains(id) {
            return Vec::new();
        }
        if let Some(parent) = self.cubes.get(id).and_then(Cube::parent) {
            if let Some(p) = self.cubes.get_mut(&parent) {
                p.remove_child(*id);
            }
        }

        let doomed = self.subtree(id);
        for cid in &doomed {
            if let Some(cube) = self.cubes.remove(cid) {
                self.by_handle.remove(&cube.handle());
            }
            self.members.remove(cid);
            self.selection.remove(cid);
            self.events.push(SceneEvent::Removed(*cid));
        }
        doomed
    }

    /// Remove several cubes (and their subtrees).
    pub fn remove_many(&mut self, ids: &[CubeId]) -> Vec<CubeId> {
        ids.iter().flat_map(|id| self.remove(id)).collect()
    }

    /// Take queued membership events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn get(&self, id: &CubeId) -> Option<&Cube> {
        self.cubes.get(id)
    }

    pub fn get_mut(&mut self, id: &CubeId) -> Option<&mut Cube> {
        self.cubes.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &CubeId) -> bool {
        self.members.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[CubeId] {
        self.members.ids()
    }

    /// Cubes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Cube> {
        self.members.iter().filter_map(|id| self.cubes.get(id))
    }

    // =============================================================
    // Hit-testing
    // =============================================================

    /// Map a ray-cast result back to the cube that owns the hit geometry.
    #[must_use]
    pub fn find_by_intersection(&self, hit: Option<HitHandle>) -> Option<CubeId> {
        hit.and_then(|h| self.by_handle.get(&h).copied())
    }

    /// Geometry of every member for the ray caster, in insertion order.
    #[must_use]
    pub fn hit_targets(&self) -> Vec<HitTarget> {
        self.iter()
            .map(|c| HitTarget { handle: c.handle(), model: c.model_matrix() })
            .collect()
    }

    // =============================================================
    // Chains
    // =============================================================

    /// `id` and all of its descendants, depth first, `id` first.
    #[must_use]
    pub fn subtree(&self, id: &CubeId) -> Vec<CubeId> {
        let mut out = Vec::new();
        let mut stack = vec![*id];
        while let Some(cid) = stack.pop() {
            let Some(cube) = self.cubes.get(&cid) else {
                continue;
            };
            out.push(cid);
            stack.extend(cube.children().iter().rev().copied());
        }
        out
    }

    /// Every ancestor of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: &CubeId) -> Vec<CubeId> {
        let mut out = Vec::new();
        let mut cursor = self.cubes.get(id).and_then(Cube::parent);
        while let Some(pid) = cursor {
            out.push(pid);
            cursor = self.cubes.get(&pid).and_then(Cube::parent);
        }
        out
    }

    /// Number of links between `id` and the root of its chain (0 for a root).
    #[must_use]
    pub fn level(&self, id: &CubeId) -> usize {
        self.ancestors(id).len()
    }

    /// Follow `child` links from `id` to the end of its chain.
    #[must_use]
    pub fn chain_tail(&self, id: &CubeId) -> CubeId {
        let mut tail = *id;
        while let Some(next) = self.cubes.get(&tail).and_then(Cube::child) {
            tail = next;
        }
        tail
    }

    /// Walk `depth` child links down from `id`.
    #[must_use]
    pub fn descend(&self, id: &CubeId, depth: usize) -> Option<CubeId> {
        let mut cursor = *id;
        for _ in 0..depth {
            cursor = self.cubes.get(&cursor)?.child()?;
        }
        self.contains(&cursor).then_some(cursor)
    }

    /// `(cube, level)` pairs for `id` (level 1) and its descendants (parent + 1).
    fn chain_levels(&self, id: &CubeId) -> Vec<(CubeId, u32)> {
        let mut out = Vec::new();
        let mut stack = vec![(*id, 1_u32)];
        while let Some((cid, level)) = stack.pop() {
            let Some(cube) = self.cubes.get(&cid) else {
                continue;
            };
            out.push((cid, level));
            stack.extend(cube.children().iter().rev().map(|c| (*c, level + 1)));
        }
        out
    }

    fn reach_levels(&self, id: &CubeId, reach: Reach) -> Vec<(CubeId, u32)> {
        match reach {
            Reach::SelfOnly if self.contains(id) => vec![(*id, 1)],
            Reach::SelfOnly => Vec::new(),
            Reach::Chain => self.chain_levels(id),
        }
    }

    // =============================================================
    // Hover and selection
    // =============================================================

    /// Set the hover flag on `id`. Unknown ids are ignored.
    pub fn hover(&mut self, id: &CubeId, on: bool) {
        if let Some(cube) = self.cubes.get_mut(id) {
            cube.hover(on);
        }
    }

    /// Select `id` and add it to the selection.
    ///
    /// Every ancestor and descendant is deselected first, so a move never
    /// reaches a cube through two selected relatives. Returns `false` if `id`
    /// is not a member.
    pub fn select(&mut self, id: &CubeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut relatives = self.ancestors(id);
        relatives.extend(self.subtree(id).into_iter().skip(1));
        for rel in relatives {
            self.deselect(&rel);
        }
        if let Some(cube) = self.cubes.get_mut(id) {
            cube.set_selected(true);
        }
        self.selection.insert(*id);
        true
    }

    /// Deselect `id` and drop it from the selection.
    pub fn deselect(&mut self, id: &CubeId) {
        if let Some(cube) = self.cubes.get_mut(id) {
            if cube.is_selected() {
                cube.set_selected(false);
            }
        }
        self.selection.remove(id);
    }

    /// Deselect every selected cube and clear the selection.
    pub fn deselect_all(&mut self) {
        for id in self.selection.ids() {
            if let Some(cube) = self.cubes.get_mut(id) {
                cube.set_selected(false);
            }
        }
        self.selection.clear();
    }

    #[must_use]
    pub fn selection(&self) -> &CubeSet {
        &self.selection
    }

    fn selected_ids(&self) -> Vec<CubeId> {
        self.selection.ids().to_vec()
    }

    // =============================================================
    // Single-cube manipulation
    // =============================================================

    /// Move `id` to `baseline + delta` and each descendant to
    /// `baseline + delta * level`.
    pub fn move_cube(&mut self, id: &CubeId, delta: DVec3) {
        for (cid, level) in self.chain_levels(id) {
            if let Some(cube) = self.cubes.get_mut(&cid) {
                cube.transform.move_to(delta, level);
            }
        }
    }

    /// Rotate `id` (and optionally its chain) by the drag heuristic in
    /// [`rotation_delta`]. `pointer` is the screen motion since the last event.
    pub fn rotate_cube(&mut self, id: &CubeId, delta: DVec3, pointer: Point, reach: Reach) {
        let rot = rotation_delta(delta, pointer.x, self.speeds.rotate, self.speeds.rotate_pointer);
        for (cid, _) in self.reach_levels(id, reach) {
            if let Some(cube) = self.cubes.get_mut(&cid) {
                cube.transform.change_attribute(Attr::Rotation, rot);
            }
        }
    }

    /// Add `factor * scale_step * level` to every scale axis.
    pub fn scale_cube(&mut self, id: &CubeId, factor: f64, reach: Reach) {
        let step = factor * self.speeds.scale_step;
        for (cid, level) in self.reach_levels(id, reach) {
            if let Some(cube) = self.cubes.get_mut(&cid) {
                cube.transform.change_attribute(Attr::Scale, step * f64::from(level));
            }
        }
    }

    /// Add `delta * level` to the live value of `attr`.
    pub fn change_attribute(&mut self, id: &CubeId, attr: Attr, delta: Delta, reach: Reach) {
        let delta = delta.to_vec3();
        for (cid, level) in self.reach_levels(id, reach) {
            if let Some(cube) = self.cubes.get_mut(&cid) {
                cube.transform.change_attribute(attr, delta * f64::from(level));
            }
        }
    }

    /// Commit every attribute of `id` and its subtree.
    pub fn commit(&mut self, id: &CubeId) {
        for cid in self.subtree(id) {
            if let Some(cube) = self.cubes.get_mut(&cid) {
                cube.transform.commit_all();
            }
        }
    }

    /// Commit every cube in the registry.
    pub fn commit_all(&mut self) {
        for cube in self.cubes.values_mut() {
            cube.transform.commit_all();
        }
    }

    /// Commit one attribute on every cube, leaving the others live.
    pub fn commit_attribute(&mut self, attr: Attr) {
        for cube in self.cubes.values_mut() {
            cube.transform.commit(attr);
        }
    }

    // =============================================================
    // Recursion
    // =============================================================

    /// Clone `id` into a chain, one clone per level from `level` up to the
    /// recursion limit. Each clone is the child of the previous one and is
    /// registered immediately. Returns the new ids in chain order; at or past
    /// the limit nothing is created.
    pub fn recurse(&mut self, id: &CubeId, level: usize, links: &LinkVectors) -> Vec<CubeId> {
        let count = self.recursion_limit.saturating_sub(level);
        self.grow_chain(id, count, links)
    }

    /// Append one clone to the tail of `id`'s chain, unless the tail already
    /// sits at the recursion limit.
    pub fn extend(&mut self, id: &CubeId, links: &LinkVectors) -> Vec<CubeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let tail = self.chain_tail(id);
        let level = self.level(&tail);
        if level >= self.recursion_limit {
            tracing::debug!(%id, level, "chain already at recursion limit");
            return Vec::new();
        }
        self.grow_chain(&tail, 1, links)
    }

    fn grow_chain(&mut self, id: &CubeId, count: usize, links: &LinkVectors) -> Vec<CubeId> {
        if count == 0 {
            tracing::debug!(%id, "recursion limit reached");
            return Vec::new();
        }
        let mut created = Vec::with_capacity(count);
        let mut cursor = *id;
        for _ in 0..count {
            let handle = self.take_handle();
            let Some(source) = self.cubes.get(&cursor) else {
                break;
            };
            let mut clone = source.clone_linked(handle, links);
            clone.set_parent(Some(cursor));
            let clone_id = clone.id();
            if let Some(parent) = self.cubes.get_mut(&cursor) {
                parent.push_child(clone_id);
            }
            self.add(clone);
            created.push(clone_id);
            cursor = clone_id;
        }
        tracing::debug!(%id, created = created.len(), "chain grown");
        created
    }

    // =============================================================
    // Selection broadcasts
    // =============================================================

    /// [`Self::move_cube`] on every selected cube.
    pub fn move_all(&mut self, delta: DVec3) {
        for id in self.selected_ids() {
            self.move_cube(&id, delta);
        }
    }

    /// [`Self::rotate_cube`] on every selected cube.
    pub fn rotate_all(&mut self, delta: DVec3, pointer: Point, reach: Reach) {
        for id in self.selected_ids() {
            self.rotate_cube(&id, delta, pointer, reach);
        }
    }

    /// [`Self::scale_cube`] on every selected cube.
    pub fn scale_all(&mut self, factor: f64, reach: Reach) {
        for id in self.selected_ids() {
            self.scale_cube(&id, factor, reach);
        }
    }

    /// [`Self::change_attribute`] on every selected cube.
    pub fn change_all(&mut self, attr: Attr, delta: Delta, reach: Reach) {
        for id in self.selected_ids() {
            self.change_attribute(&id, attr, delta, reach);
        }
    }

    /// [`Self::recurse`] from level 0 on every selected cube, concatenated.
    pub fn recurse_all(&mut self, links: &LinkVectors) -> Vec<CubeId> {
        self.selected_ids()
            .iter()
            .flat_map(|id| self.recurse(id, 0, links))
            .collect()
    }

    /// [`Self::extend`] on every selected cube, concatenated.
    pub fn extend_all(&mut self, links: &LinkVectors) -> Vec<CubeId> {
        self.selected_ids()
            .iter()
            .flat_map(|id| self.extend(id, links))
            .collect()
    }
}
