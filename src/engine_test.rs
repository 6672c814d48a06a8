#![allow(clippy::float_cmp)]

use super::*;
use crate::cube::HitHandle;
use crate::hit::{HitTarget, Ray, ReferencePlane, nearest_hit};

// =============================================================
// Helpers
// =============================================================

/// Orthographic view straight down -z: screen (x, y) is world (x, y).
#[derive(Debug, Clone, Copy)]
struct TopDown {
    lon: f64,
    lat: f64,
    fov: f64,
}

impl Default for TopDown {
    fn default() -> Self {
        Self { lon: 0.0, lat: 0.0, fov: 70.0 }
    }
}

fn ray_at(screen: Point) -> Ray {
    Ray::new(DVec3::new(screen.x, screen.y, 1000.0), DVec3::NEG_Z)
}

impl Viewport for TopDown {
    fn cast_ray(&self, screen: Point, targets: &[HitTarget]) -> Option<HitHandle> {
        nearest_hit(&ray_at(screen), targets)
    }

    fn intersect_plane(&self, screen: Point, plane: &ReferencePlane) -> Option<DVec3> {
        plane.intersect(&ray_at(screen))
    }

    fn reference_plane(&self, through: DVec3) -> ReferencePlane {
        ReferencePlane::new(through, DVec3::Z)
    }

    fn target(&self) -> DVec3 {
        DVec3::ZERO
    }

    fn orbit(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    fn set_orbit(&mut self, lon: f64, lat: f64) {
        self.lon = lon;
        self.lat = lat.clamp(-85.0, 85.0);
    }

    fn fov(&self) -> f64 {
        self.fov
    }

    fn set_fov(&mut self, fov_deg: f64) {
        self.fov = fov_deg.clamp(10.0, 150.0);
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn engine() -> EngineCore<TopDown> {
    EngineCore::with_viewport(TopDown::default(), EditorConfig::default()).unwrap()
}

fn no_mods() -> Modifiers {
    Modifiers::default()
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Two cubes: A at the origin, B at (40, 0, 0).
fn two_cubes() -> (EngineCore<TopDown>, CubeId, CubeId) {
    let mut core = engine();
    let a = core.create_cube(20.0, DVec3::ZERO).unwrap();
    let b = core.create_cube(20.0, DVec3::new(40.0, 0.0, 0.0)).unwrap();
    core.drain_actions();
    (core, a, b)
}

fn position(core: &EngineCore<TopDown>, id: &CubeId) -> DVec3 {
    core.cube(id).unwrap().position
}

fn drag(core: &mut EngineCore<TopDown>, from: Point, to: Point, button: Button) {
    core.on_pointer_move(from, no_mods());
    core.on_pointer_down(from, button, no_mods());
    core.on_pointer_move(to, no_mods());
    core.on_pointer_up(to, button, no_mods());
}

fn is_object_drag(core: &EngineCore<TopDown>) -> bool {
    matches!(core.input, InputState::ObjectDrag(_))
}

fn gesture(core: &EngineCore<TopDown>) -> Gesture {
    match core.input {
        InputState::ObjectDrag(g) => g,
        other => panic!("expected object drag, got {other:?}"),
    }
}

// =============================================================
// Construction
// =============================================================

#[test]
fn default_engine_is_idle_and_empty() {
    let core = EngineCore::new();
    assert!(matches!(core.input, InputState::Idle));
    assert!(core.registry.is_empty());
    assert!(core.selection().is_empty());
    assert!(core.hovered().is_none());
}

#[test]
fn with_config_rejects_invalid_config() {
    let config = EditorConfig { recursion_limit: 0, ..EditorConfig::default() };
    assert!(matches!(EngineCore::with_config(config), Err(ConfigError::RecursionLimit)));
}

#[test]
fn with_config_applies_recursion_limit() {
    let config = EditorConfig { recursion_limit: 4, ..EditorConfig::default() };
    let core = EngineCore::with_config(config).unwrap();
    assert_eq!(core.registry.recursion_limit(), 4);
}

// =============================================================
// Direct API
// =============================================================

#[test]
fn create_cube_queues_added_action() {
    let mut core = engine();
    let id = core.create_cube(20.0, DVec3::new(1.0, 2.0, 3.0)).unwrap();
    let actions = core.drain_actions();
    assert_eq!(actions.len(), 1);
    let Action::CubeAdded(snap) = &actions[0] else {
        panic!("expected CubeAdded, got {actions:?}");
    };
    assert_eq!(snap.id, id);
    assert_eq!(snap.position, DVec3::new(1.0, 2.0, 3.0));
    assert!(core.drain_actions().is_empty());
}

#[test]
fn create_cube_rejects_bad_size_and_position() {
    let mut core = engine();
    assert!(core.create_cube(f64::NAN, DVec3::ZERO).is_none());
    assert!(core.create_cube(0.0, DVec3::ZERO).is_none());
    assert!(core.create_cube(-5.0, DVec3::ZERO).is_none());
    assert!(core.create_cube(20.0, DVec3::new(f64::INFINITY, 0.0, 0.0)).is_none());
    assert!(core.registry.is_empty());
    assert!(core.drain_actions().is_empty());
}

#[test]
fn rejected_cube_never_captures_hover() {
    let mut core = engine();
    core.create_cube(f64::NAN, DVec3::ZERO);
    core.on_pointer_move(pt(500.0, 500.0), no_mods());
    assert_eq!(core.hovered(), None);
    core.on_pointer_down(pt(500.0, 500.0), Button::Primary, no_mods());
    assert!(matches!(core.input, InputState::CameraDrag { .. }));
}

#[test]
fn cube_added_and_removed_between_drains_emits_nothing() {
    let mut core = engine();
    let kept = core.create_cube(20.0, DVec3::ZERO).unwrap();
    core.drain_actions();
    let gone = core.create_cube(20.0, DVec3::new(40.0, 0.0, 0.0)).unwrap();
    core.remove_cube(&gone);
    core.remove_cube(&kept);
    let actions = core.drain_actions();
    assert_eq!(actions, vec![Action::CubeRemoved { id: kept }]);
}

#[test]
fn move_selection_commits() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.move_selection(DVec3::new(5.0, 0.0, 0.0));
    core.move_selection(DVec3::new(3.0, 0.0, 0.0));
    assert_eq!(position(&core, &a), DVec3::new(8.0, 0.0, 0.0));
}

#[test]
fn scale_selection_reaches_chain_by_default() {
    let mut core = engine();
    let a = core.create_cube(20.0, DVec3::ZERO).unwrap();
    core.select_cube(&a);
    let clone = core.duplicate_selection()[0];
    core.deselect_all();
    core.select_cube(&a);
    core.scale_selection(10.0);
    let sa = core.cube(&a).unwrap().scale.x;
    let sc = core.cube(&clone).unwrap().scale.x;
    assert!((sa - 1.1).abs() < 1e-12);
    assert!((sc - 1.2).abs() < 1e-12);
}

#[test]
fn rotate_selection_with_vertical_delta_only_yaws() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.rotate_selection(DVec3::new(0.0, 5.0, 0.0), 10.0, 0.0);
    let rot = core.cube(&a).unwrap().rotation;
    assert!(rot.is_finite());
    assert_eq!(rot.x, 0.0);
    assert_eq!(rot.z, 0.0);
    assert!((rot.y - 10.0 * 0.003).abs() < 1e-12);
}

#[test]
fn duplicate_selection_selects_clones() {
    let (mut core, a, b) = two_cubes();
    core.select_cube(&a);
    core.select_cube(&b);
    let created = core.duplicate_selection();
    assert_eq!(created.len(), 2);
    assert_eq!(core.selection(), created.as_slice());
    assert_eq!(core.cube(&created[0]).unwrap().parent_id, Some(a));
    assert_eq!(core.cube(&a).unwrap().child_id, Some(created[0]));
}

#[test]
fn recurse_cube_builds_full_chain() {
    let mut core = engine();
    let a = core.create_cube(20.0, DVec3::ZERO).unwrap();
    let chain = core.recurse_cube(&a, &LinkVectors::default());
    assert_eq!(chain.len(), 50);
    assert_eq!(core.registry.len(), 51);
    assert_eq!(core.cube(&chain[0]).unwrap().parent_id, Some(a));
}

#[test]
fn change_attribute_is_live_until_commit() {
    let (mut core, a, _) = two_cubes();
    core.change_attribute(&a, Attr::Position, DVec3::X, Reach::SelfOnly);
    assert_eq!(position(&core, &a), DVec3::X);
    assert!(core.registry.get(&a).unwrap().transform.is_dirty());
    core.commit(&a);
    assert!(!core.registry.get(&a).unwrap().transform.is_dirty());
}

#[test]
fn remove_cube_takes_chain_and_emits_removals() {
    let mut core = engine();
    let a = core.create_cube(20.0, DVec3::ZERO).unwrap();
    let chain = core.recurse_cube(&a, &LinkVectors::default());
    core.drain_actions();
    let removed = core.remove_cube(&a);
    assert_eq!(removed.len(), 51);
    assert!(core.registry.is_empty());
    let actions = core.drain_actions();
    assert_eq!(actions.len(), 51);
    assert!(actions.contains(&Action::CubeRemoved { id: chain[49] }));
}

#[test]
fn orbit_by_and_reset_camera() {
    let mut core = engine();
    core.orbit_by(30.0, 100.0);
    assert_eq!(core.viewport.orbit(), (30.0, 85.0));
    core.reset_camera();
    assert_eq!(core.viewport.orbit(), (0.0, 0.0));
}

#[test]
fn cube_unknown_is_none() {
    let core = engine();
    assert!(core.cube(&uuid::Uuid::new_v4()).is_none());
}

// =============================================================
// Hover
// =============================================================

#[test]
fn hover_marks_only_cube_under_pointer() {
    let (mut core, a, b) = two_cubes();
    let actions = core.on_pointer_move(pt(0.0, 0.0), no_mods());
    assert!(core.cube(&a).unwrap().hovered);
    assert!(!core.cube(&b).unwrap().hovered);
    assert_eq!(core.hovered(), Some(a));
    assert!(actions.contains(&Action::SetCursor("move".into())));
}

#[test]
fn hover_moves_between_cubes_and_clears() {
    let (mut core, a, b) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_move(pt(40.0, 0.0), no_mods());
    assert!(!core.cube(&a).unwrap().hovered);
    assert!(core.cube(&b).unwrap().hovered);

    let actions = core.on_pointer_move(pt(200.0, 200.0), no_mods());
    assert!(!core.cube(&b).unwrap().hovered);
    assert!(core.hovered().is_none());
    assert!(actions.contains(&Action::SetCursor("auto".into())));
}

#[test]
fn hover_unchanged_emits_no_cursor() {
    let (mut core, _, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    let actions = core.on_pointer_move(pt(1.0, 1.0), no_mods());
    assert!(!actions.iter().any(|a| matches!(a, Action::SetCursor(_))));
}

// =============================================================
// Move gesture
// =============================================================

#[test]
fn primary_drag_moves_hovered_cube() {
    let (mut core, a, b) = two_cubes();
    drag(&mut core, pt(0.0, 0.0), pt(5.0, 0.0), Button::Primary);
    assert_eq!(position(&core, &a), DVec3::new(5.0, 0.0, 0.0));
    assert_eq!(position(&core, &b), DVec3::new(40.0, 0.0, 0.0));
    assert!(matches!(core.input, InputState::Idle));
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn second_drag_starts_from_committed_baseline() {
    let (mut core, a, _) = two_cubes();
    drag(&mut core, pt(0.0, 0.0), pt(5.0, 0.0), Button::Primary);
    drag(&mut core, pt(5.0, 0.0), pt(8.0, 0.0), Button::Primary);
    assert_eq!(position(&core, &a), DVec3::new(8.0, 0.0, 0.0));
}

#[test]
fn many_small_moves_do_not_drift() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    for i in 1..=100 {
        core.on_pointer_move(pt(f64::from(i) * 0.1, 0.0), no_mods());
    }
    let p = position(&core, &a);
    assert!((p.x - 10.0).abs() < 1e-9);
    assert_eq!(core.registry.get(&a).unwrap().transform.channel(Attr::Position).baseline, DVec3::ZERO);
}

#[test]
fn move_fans_out_down_chain() {
    let mut core = engine();
    let a = core.create_cube(20.0, DVec3::ZERO).unwrap();
    core.select_cube(&a);
    let c1 = core.duplicate_selection()[0];
    let c2 = core.duplicate_selection()[0];
    core.deselect_all();

    drag(&mut core, pt(0.0, 0.0), pt(0.0, 4.0), Button::Primary);
    assert_eq!(position(&core, &a), DVec3::new(0.0, 4.0, 0.0));
    assert_eq!(position(&core, &c1), DVec3::new(0.0, 8.0, 0.0));
    assert_eq!(position(&core, &c2), DVec3::new(0.0, 12.0, 0.0));
}

#[test]
fn pointer_move_without_plane_hit_is_noop() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    // Swap in a plane the top-down ray never meets.
    if let InputState::ObjectDrag(mut g) = core.input {
        g.plane = ReferencePlane::new(DVec3::ZERO, DVec3::X);
        core.input = InputState::ObjectDrag(g);
    }
    core.on_pointer_move(pt(5.0, 0.0), no_mods());
    assert_eq!(position(&core, &a), DVec3::ZERO);
}

// =============================================================
// Camera drag
// =============================================================

#[test]
fn primary_down_on_empty_space_deselects_and_orbits() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.on_pointer_move(pt(200.0, 200.0), no_mods());
    core.on_pointer_down(pt(200.0, 200.0), Button::Primary, no_mods());
    assert!(core.selection().is_empty());
    assert!(!core.cube(&a).unwrap().selected);
    assert!(matches!(core.input, InputState::CameraDrag { .. }));

    core.on_pointer_move(pt(210.0, 205.0), no_mods());
    let (lon, lat) = core.viewport.orbit();
    assert!((lon - 4.0).abs() < 1e-12);
    assert!((lat - 2.0).abs() < 1e-12);

    core.on_pointer_up(pt(210.0, 205.0), Button::Primary, no_mods());
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn camera_drag_latitude_is_clamped() {
    let mut core = engine();
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(0.0, 1000.0), no_mods());
    assert_eq!(core.viewport.orbit().1, 85.0);
}

// =============================================================
// Rotate gesture
// =============================================================

#[test]
fn secondary_down_on_cube_enters_rotate() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Secondary, no_mods());
    assert_eq!(gesture(&core).mode, GestureMode::Rotate);
    assert_eq!(core.selection(), &[a]);
}

#[test]
fn secondary_on_empty_space_rotates_existing_selection() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.on_pointer_down(pt(200.0, 200.0), Button::Secondary, no_mods());
    assert_eq!(gesture(&core).mode, GestureMode::Rotate);

    core.on_pointer_move(pt(210.0, 200.0), no_mods());
    let rot = core.cube(&a).unwrap().rotation;
    assert!(rot.y > 0.0);
    assert!(rot.is_finite());
}

#[test]
fn secondary_on_empty_space_without_selection_is_noop() {
    let mut core = engine();
    core.on_pointer_down(pt(0.0, 0.0), Button::Secondary, no_mods());
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn vertical_rotate_drag_never_produces_nan() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Secondary, no_mods());
    core.on_pointer_move(pt(0.0, 5.0), no_mods());
    let rot = core.cube(&a).unwrap().rotation;
    assert!(rot.is_finite());
    assert_eq!(rot, DVec3::ZERO);
}

#[test]
fn rotate_release_commits_rotation() {
    let (mut core, a, _) = two_cubes();
    drag(&mut core, pt(0.0, 0.0), pt(6.0, 0.0), Button::Secondary);
    let t = &core.registry.get(&a).unwrap().transform;
    assert!(!t.is_dirty());
    assert!(t.get(Attr::Rotation).y > 0.0);
}

// =============================================================
// Duplicate gesture
// =============================================================

#[test]
fn both_buttons_duplicate_exactly_once() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Secondary, no_mods());
    assert_eq!(core.registry.len(), 3);
    let g = gesture(&core);
    assert_eq!(g.mode, GestureMode::Duplicate);
    assert!(g.recursion_triggered);

    // Both buttons stay held: further presses and motion never repeat it.
    core.on_pointer_down(pt(1.0, 0.0), Button::Secondary, no_mods());
    core.on_pointer_move(pt(2.0, 0.0), no_mods());
    core.on_key_down(&Key("Control".into()), no_mods());
    assert_eq!(core.registry.len(), 3);
    assert_eq!(core.registry.get(&a).unwrap().children().len(), 1);
}

#[test]
fn duplicate_moves_clone_not_source() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(2.0, 0.0), no_mods());
    core.on_pointer_down(pt(2.0, 0.0), Button::Secondary, no_mods());
    core.on_pointer_move(pt(7.0, 0.0), no_mods());

    let clone = core.cube(&a).unwrap().child_id.unwrap();
    assert_eq!(position(&core, &a), DVec3::new(2.0, 0.0, 0.0));
    assert_eq!(position(&core, &clone), DVec3::new(7.0, 0.0, 0.0));
    assert_eq!(core.selection(), &[clone]);
}

#[test]
fn control_key_duplicates_during_drag() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    let actions = core.on_key_down(&Key("Control".into()), no_mods());
    assert_eq!(core.registry.len(), 3);
    assert!(actions.iter().any(|x| matches!(x, Action::CubeAdded(_))));
    assert_eq!(core.registry.get(&a).unwrap().children().len(), 1);
}

#[test]
fn control_key_outside_drag_does_nothing() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.on_key_down(&Key("Meta".into()), no_mods());
    assert_eq!(core.registry.len(), 2);
}

#[test]
fn ctrl_held_on_press_duplicates() {
    let (mut core, _, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    let mods = Modifiers { ctrl: true, ..Modifiers::default() };
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, mods);
    assert_eq!(core.registry.len(), 3);
    assert_eq!(gesture(&core).mode, GestureMode::Duplicate);
}

// =============================================================
// Release handling
// =============================================================

#[test]
fn mismatched_release_commits_and_deselects_but_stays_in_drag() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Secondary, no_mods());
    core.on_pointer_move(pt(3.0, 0.0), no_mods());

    core.on_pointer_up(pt(3.0, 0.0), Button::Secondary, no_mods());
    assert!(is_object_drag(&core));
    assert!(core.selection().is_empty());
    let g = gesture(&core);
    assert!(!g.recursion_triggered);
    assert_eq!(g.accumulated, DVec3::ZERO);
    assert!(core.registry.iter().all(|c| !c.transform.is_dirty()));
    assert_eq!(position(&core, &a), DVec3::ZERO);

    core.on_pointer_up(pt(3.0, 0.0), Button::Primary, no_mods());
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn release_without_gesture_is_silent() {
    let mut core = engine();
    let actions = core.on_pointer_up(pt(0.0, 0.0), Button::Primary, no_mods());
    assert!(actions.is_empty());
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn pointer_cancel_ends_drag_like_release() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(4.0, 0.0), no_mods());
    core.on_pointer_cancel();
    assert!(matches!(core.input, InputState::Idle));
    assert!(!core.registry.get(&a).unwrap().transform.is_dirty());
    assert_eq!(position(&core, &a), DVec3::new(4.0, 0.0, 0.0));
}

#[test]
fn pointer_cancel_ends_camera_drag() {
    let mut core = engine();
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_cancel();
    assert!(matches!(core.input, InputState::Idle));
}

// =============================================================
// Wheel
// =============================================================

#[test]
fn wheel_with_selection_scales_and_commits() {
    let (mut core, a, _) = two_cubes();
    core.select_cube(&a);
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -100.0 }, no_mods());
    let t = &core.registry.get(&a).unwrap().transform;
    assert!((t.get(Attr::Scale).x - 1.05).abs() < 1e-12);
    assert!(!t.channel(Attr::Scale).is_dirty());
    assert_eq!(core.viewport.fov(), 70.0);
}

#[test]
fn wheel_without_selection_changes_fov() {
    let mut core = engine();
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 100.0 }, no_mods());
    assert!((core.viewport.fov() - 75.0).abs() < 1e-12);
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 1.0e6 }, no_mods());
    assert_eq!(core.viewport.fov(), 150.0);
}

#[test]
fn wheel_during_drag_keeps_move_live() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_mods());
    core.on_pointer_move(pt(5.0, 0.0), no_mods());
    core.on_wheel(pt(5.0, 0.0), WheelDelta { dx: 0.0, dy: -20.0 }, no_mods());
    core.on_pointer_move(pt(6.0, 0.0), no_mods());
    assert_eq!(position(&core, &a), DVec3::new(6.0, 0.0, 0.0));
}

// =============================================================
// Keys and double-click
// =============================================================

#[test]
fn delete_key_removes_selection_with_subtree() {
    let (mut core, a, b) = two_cubes();
    core.select_cube(&a);
    core.duplicate_selection();
    core.deselect_all();
    core.select_cube(&a);
    core.drain_actions();

    let actions = core.on_key_down(&Key("Delete".into()), no_mods());
    assert_eq!(core.registry.len(), 1);
    assert!(core.registry.contains(&b));
    let removed = actions.iter().filter(|x| matches!(x, Action::CubeRemoved { .. })).count();
    assert_eq!(removed, 2);
}

#[test]
fn backspace_clears_hover_of_removed_cube() {
    let (mut core, a, _) = two_cubes();
    core.on_pointer_move(pt(0.0, 0.0), no_mods());
    core.select_cube(&a);
    core.on_key_down(&Key("Backspace".into()), no_mods());
    assert!(core.hovered().is_none());
}

#[test]
fn escape_deselects_all() {
    let (mut core, a, b) = two_cubes();
    core.select_cube(&a);
    core.select_cube(&b);
    core.on_key_down(&Key("Escape".into()), no_mods());
    assert!(core.selection().is_empty());
    assert!(!core.cube(&a).unwrap().selected);
}

#[test]
fn double_click_on_empty_space_creates_cube() {
    let mut core = engine();
    let actions = core.on_double_click(pt(30.0, -20.0));
    assert_eq!(core.registry.len(), 1);
    let Some(Action::CubeAdded(snap)) = actions.first() else {
        panic!("expected CubeAdded first, got {actions:?}");
    };
    assert_eq!(snap.position, DVec3::new(30.0, -20.0, 0.0));
    assert_eq!(snap.size, 20.0);
}

#[test]
fn double_click_on_cube_does_nothing() {
    let (mut core, _, _) = two_cubes();
    let actions = core.on_double_click(pt(0.0, 0.0));
    assert_eq!(core.registry.len(), 2);
    assert!(actions.is_empty());
}

// =============================================================
// Serialization
// =============================================================

#[test]
fn actions_serialize_with_kind_tag() {
    let json = serde_json::to_value(Action::SetCursor("move".into())).unwrap();
    assert_eq!(json, serde_json::json!({ "kind": "set_cursor", "data": "move" }));
    let json = serde_json::to_value(Action::RenderNeeded).unwrap();
    assert_eq!(json, serde_json::json!({ "kind": "render_needed" }));
}
