/// Mouse and touch input folded into single-finger events
use cone_core::{DeviceOrientation, RenderingEngine};
use nalgebra::Point2;
use winit::event::TouchPhase;

/// A finger event ready for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerEvent {
    Down(Point2<i32>),
    Move(Point2<i32>, Point2<i32>),
    Up(Point2<i32>),
}

impl FingerEvent {
    pub fn dispatch(self, engine: &mut dyn RenderingEngine) {
        match self {
            FingerEvent::Down(location) => engine.on_finger_down(location),
            FingerEvent::Move(old, new) => engine.on_finger_move(old, new),
            FingerEvent::Up(location) => engine.on_finger_up(location),
        }
    }
}

/// Tracks the cursor so a mouse behaves like one finger
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerTracker {
    cursor: Point2<i32>,
    pressed: bool,
}

impl FingerTracker {
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<FingerEvent> {
        let previous = self.cursor;
        self.cursor = Point2::new(x.round() as i32, y.round() as i32);
        (self.pressed && previous != self.cursor).then_some(FingerEvent::Move(previous, self.cursor))
    }

    pub fn pressed(&mut self) -> Option<FingerEvent> {
        if self.pressed {
            return None;
        }
        self.pressed = true;
        Some(FingerEvent::Down(self.cursor))
    }

    pub fn released(&mut self) -> Option<FingerEvent> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        Some(FingerEvent::Up(self.cursor))
    }

    /// Events for one touch sample; a lift-off first reports its final move
    pub fn touched(&mut self, phase: TouchPhase, x: f64, y: f64) -> Vec<FingerEvent> {
        let moved = self.cursor_moved(x, y);
        let edge = match phase {
            TouchPhase::Started => self.pressed(),
            TouchPhase::Moved => None,
            TouchPhase::Ended | TouchPhase::Cancelled => self.released(),
        };
        moved.into_iter().chain(edge).collect()
    }
}

/// Orientation bound to a number key ("0" to "6")
pub fn orientation_for_key(key: &str) -> Option<DeviceOrientation> {
    let code = key.parse::<u32>().ok()?;
    DeviceOrientation::try_from(code).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_sequence() {
        let mut tracker = FingerTracker::default();
        assert_eq!(tracker.cursor_moved(10.0, 20.0), None);
        assert_eq!(tracker.pressed(), Some(FingerEvent::Down(Point2::new(10, 20))));
        assert_eq!(tracker.pressed(), None);
        assert_eq!(
            tracker.cursor_moved(12.4, 25.6),
            Some(FingerEvent::Move(Point2::new(10, 20), Point2::new(12, 26)))
        );
        assert_eq!(tracker.cursor_moved(12.0, 26.0), None);
        assert_eq!(tracker.released(), Some(FingerEvent::Up(Point2::new(12, 26))));
        assert_eq!(tracker.released(), None);
    }

    #[test]
    fn test_orientation_keys() {
        assert_eq!(orientation_for_key("4"), Some(DeviceOrientation::LandscapeRight));
        assert_eq!(orientation_for_key("0"), Some(DeviceOrientation::Unknown));
        assert_eq!(orientation_for_key("7"), None);
        assert_eq!(orientation_for_key("a"), None);
    }

    #[test]
    fn test_touch_end_reports_final_move() {
        let mut tracker = FingerTracker::default();
        assert_eq!(
            tracker.touched(TouchPhase::Started, 10.0, 20.0),
            vec![FingerEvent::Down(Point2::new(10, 20))]
        );
        assert_eq!(
            tracker.touched(TouchPhase::Moved, 15.0, 20.0),
            vec![FingerEvent::Move(Point2::new(10, 20), Point2::new(15, 20))]
        );
        assert_eq!(
            tracker.touched(TouchPhase::Ended, 30.0, 40.0),
            vec![
                FingerEvent::Move(Point2::new(15, 20), Point2::new(30, 40)),
                FingerEvent::Up(Point2::new(30, 40)),
            ]
        );
        assert!(tracker.touched(TouchPhase::Moved, 31.0, 40.0).is_empty());
    }
}
