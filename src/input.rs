//! Input model: mouse buttons, modifier keys, and the gesture state machine.
//!
//! This module defines the types consumed by the gesture router in
//! [`crate::engine`]. `InputState` is the active gesture being tracked between
//! button-down and button-up; an object drag carries a [`Gesture`] with
//! everything needed to turn reference-plane intersections into incremental
//! deltas and to decide, on release, whether the gesture ended or was
//! cancelled.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use glam::DVec3;

use crate::camera::Point;
use crate::hit::ReferencePlane;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

impl Button {
    /// Map a DOM `MouseEvent.button` code.
    #[must_use]
    pub fn from_dom(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// A keyboard key.
///
/// The inner string holds the key name as reported by the browser (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// What an object drag does with pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    /// Translate the selection by the drag's total offset.
    Move,
    /// Rotate the selection by each frame's incremental offset.
    Rotate,
    /// The duplicate fired; motion moves the fresh clones.
    Duplicate,
}

/// State of one object drag, from qualifying button-down to matching button-up.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy)]
pub struct Gesture {
    pub mode: GestureMode,
    /// The button whose release ends the gesture.
    pub initiator: Button,
    /// Screen position at button-down.
    pub start_pointer: Point,
    /// Screen position at the previous event.
    pub last_pointer: Point,
    /// Plane the pointer ray is intersected with while dragging.
    pub plane: ReferencePlane,
    /// Press point relative to the plane origin. `None` until the pointer
    /// ray first meets the plane.
    pub plane_offset: Option<DVec3>,
    /// Cumulative delta at the previous frame.
    pub previous: DVec3,
    /// Sum of the incremental deltas applied to the current selection.
    pub accumulated: DVec3,
    pub primary_down: bool,
    pub secondary_down: bool,
    /// Set once the duplicate has fired; blocks repeats within the gesture.
    pub recursion_triggered: bool,
}

impl Gesture {
    /// A fresh gesture started by `initiator` at `pointer`.
    #[must_use]
    pub fn new(mode: GestureMode, initiator: Button, pointer: Point, plane: ReferencePlane) -> Self {
        Self {
            mode,
            initiator,
            start_pointer: pointer,
            last_pointer: pointer,
            plane,
            plane_offset: None,
            previous: DVec3::ZERO,
            accumulated: DVec3::ZERO,
            primary_down: initiator == Button::Primary,
            secondary_down: initiator == Button::Secondary,
            recursion_triggered: false,
        }
    }

    /// Whether both manipulation buttons are held.
    #[must_use]
    pub fn both_down(&self) -> bool {
        self.primary_down && self.secondary_down
    }

    /// Record a button transition. Other buttons are ignored.
    pub fn set_button(&mut self, button: Button, down: bool) {
        match button {
            Button::Primary => self.primary_down = down,
            Button::Secondary => self.secondary_down = down,
            Button::Middle => {}
        }
    }

    /// Turn a plane hit into this frame's incremental delta.
    ///
    /// The cumulative delta since the press is `(hit - plane.origin) -
    /// plane_offset`. Subtracting the previous frame's cumulative delta
    /// yields the increment, which is also folded into `accumulated`. The
    /// first hit of a gesture whose press missed the plane only establishes
    /// the offset and yields zero.
    pub fn advance(&mut self, hit: DVec3) -> DVec3 {
        let relative = hit - self.plane.origin;
        let Some(offset) = self.plane_offset else {
            self.plane_offset = Some(relative);
            return DVec3::ZERO;
        };
        let cumulative = relative - offset;
        let incremental = cumulative - self.previous;
        self.previous = cumulative;
        self.accumulated += incremental;
        incremental
    }

    /// Zero the accumulated delta so the next frames move a new selection
    /// from its own baseline.
    pub fn rebase(&mut self) {
        self.accumulated = DVec3::ZERO;
    }

    /// Zero every accumulator.
    pub fn reset_accumulators(&mut self) {
        self.previous = DVec3::ZERO;
        self.accumulated = DVec3::ZERO;
        self.plane_offset = None;
    }
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Copy, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next button-down.
    #[default]
    Idle,
    /// Primary drag over empty space orbits the camera.
    CameraDrag {
        /// Screen position at button-down.
        start_screen: Point,
        /// Camera longitude at button-down, in degrees.
        start_lon: f64,
        /// Camera latitude at button-down, in degrees.
        start_lat: f64,
    },
    /// A move, rotate, or duplicate drag on the selection.
    ObjectDrag(Gesture),
}
