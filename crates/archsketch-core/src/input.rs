//! Pointer and keyboard input model.
//!
//! Positions arriving here are in screen coordinates. Tools never see them
//! directly; the canvas maps them through the view transform first.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false, alt: false, meta: false };
}

/// Pointer event type for unified mouse/touch/pen handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Move {
        position: Point,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    /// The platform aborted the gesture (palm rejection, multi-touch).
    Cancel,
    DoubleClick {
        position: Point,
        modifiers: Modifiers,
    },
    Scroll {
        position: Point,
        delta: Vec2,
        modifiers: Modifiers,
    },
}

impl PointerEvent {
    pub fn down(position: Point) -> Self {
        Self::Down { position, button: MouseButton::Left, modifiers: Modifiers::NONE }
    }

    pub fn moved(position: Point) -> Self {
        Self::Move { position, modifiers: Modifiers::NONE }
    }

    pub fn up(position: Point) -> Self {
        Self::Up { position, button: MouseButton::Left, modifiers: Modifiers::NONE }
    }

    pub fn double_click(position: Point) -> Self {
        Self::DoubleClick { position, modifiers: Modifiers::NONE }
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Down { position, .. }
            | Self::Move { position, .. }
            | Self::Up { position, .. }
            | Self::DoubleClick { position, .. }
            | Self::Scroll { position, .. } => Some(*position),
            Self::Cancel => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::Down { modifiers, .. }
            | Self::Move { modifiers, .. }
            | Self::Up { modifiers, .. }
            | Self::DoubleClick { modifiers, .. }
            | Self::Scroll { modifiers, .. } => *modifiers,
            Self::Cancel => Modifiers::NONE,
        }
    }

    /// Same event with the position replaced.
    pub fn with_position(self, p: Point) -> Self {
        match self {
            Self::Down { button, modifiers, .. } => Self::Down { position: p, button, modifiers },
            Self::Move { modifiers, .. } => Self::Move { position: p, modifiers },
            Self::Up { button, modifiers, .. } => Self::Up { position: p, button, modifiers },
            Self::DoubleClick { modifiers, .. } => Self::DoubleClick { position: p, modifiers },
            Self::Scroll { delta, modifiers, .. } => Self::Scroll { position: p, delta, modifiers },
            Self::Cancel => Self::Cancel,
        }
    }
}

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Delete,
    Char(char),
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Synthesizes double-clicks for hosts that only report single presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    /// Last click time and screen position.
    last: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a press; returns true if it completes a double-click.
    pub fn register(&mut self, position: Point) -> bool {
        self.register_at(position, Instant::now())
    }

    pub fn register_at(&mut self, position: Point, now: Instant) -> bool {
        if let Some((last_time, last_pos)) = self.last {
            let elapsed = now.saturating_duration_since(last_time).as_millis();
            if elapsed < DOUBLE_CLICK_TIME_MS && position.distance(last_pos) < DOUBLE_CLICK_DISTANCE {
                // Reset so a triple click is not a second double-click.
                self.last = None;
                return true;
            }
        }
        self.last = Some((now, position));
        false
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Tracks pointer state across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
    /// Start position of the current left-button drag.
    pub drag_start: Option<Point>,
    /// Start of a middle-button pan.
    pub pan_anchor: Option<Point>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        if let Some(p) = event.position() {
            self.pointer_position = p;
        }
        self.modifiers = event.modifiers();
        match *event {
            PointerEvent::Down { position, button, .. } => {
                self.pressed_buttons.insert(button);
                match button {
                    MouseButton::Left => self.drag_start = Some(position),
                    MouseButton::Middle => self.pan_anchor = Some(position),
                    MouseButton::Right => {}
                }
            }
            PointerEvent::Up { button, .. } => {
                self.pressed_buttons.remove(&button);
                match button {
                    MouseButton::Left => self.drag_start = None,
                    MouseButton::Middle => self.pan_anchor = None,
                    MouseButton::Right => {}
                }
            }
            PointerEvent::Cancel => {
                self.pressed_buttons.clear();
                self.drag_start = None;
                self.pan_anchor = None;
            }
            PointerEvent::Move { .. } | PointerEvent::DoubleClick { .. } | PointerEvent::Scroll { .. } => {}
        }
    }

    /// Check if a button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Get the drag delta from start position, if dragging.
    pub fn drag_delta(&self) -> Option<Vec2> {
        self.drag_start.map(|start| self.pointer_position - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_button_press_and_release() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::down(Point::new(100.0, 100.0)));
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));
        input.handle_pointer_event(&PointerEvent::up(Point::new(100.0, 100.0)));
        assert!(!input.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_drag_tracking() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::down(Point::new(100.0, 100.0)));
        assert_eq!(input.drag_start, Some(Point::new(100.0, 100.0)));
        input.handle_pointer_event(&PointerEvent::moved(Point::new(150.0, 120.0)));
        let delta = input.drag_delta().unwrap();
        assert!((delta.x - 50.0).abs() < f64::EPSILON);
        assert!((delta.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cancel_clears_drag() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::down(Point::new(1.0, 1.0)));
        input.handle_pointer_event(&PointerEvent::Cancel);
        assert!(input.drag_start.is_none());
        assert!(!input.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_double_click_detection() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        let pos = Point::new(100.0, 100.0);
        assert!(!clicks.register_at(pos, t0));
        assert!(clicks.register_at(pos, t0 + Duration::from_millis(200)));
        // Third click starts over.
        assert!(!clicks.register_at(pos, t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_double_click_too_far_or_slow() {
        let mut clicks = ClickTracker::new();
        let t0 = Instant::now();
        assert!(!clicks.register_at(Point::new(100.0, 100.0), t0));
        assert!(!clicks.register_at(Point::new(200.0, 200.0), t0 + Duration::from_millis(100)));
        assert!(!clicks.register_at(Point::new(200.0, 200.0), t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_with_position() {
        let e = PointerEvent::Down { position: Point::ZERO, button: MouseButton::Middle, modifiers: Modifiers::SHIFT };
        let moved = e.with_position(Point::new(3.0, 4.0));
        assert_eq!(moved.position(), Some(Point::new(3.0, 4.0)));
        assert_eq!(moved.modifiers(), Modifiers::SHIFT);
    }
}
