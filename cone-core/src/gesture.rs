/// Single-finger gestures mapped to a rotation angle and scale
use log::warn;
use nalgebra::{Point2, Vector2};

/// Rotation and scale driven by touch input, read by the render pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionState {
    /// Degrees counterclockwise from screen-up, in [-180, 180]
    pub rotation_angle: f32,
    pub scale: f32,
    /// Screen point angles are measured around, fixed at initialization
    pub pivot: Point2<i32>,
}

impl InteractionState {
    pub fn new(pivot: Point2<i32>) -> Self {
        Self {
            rotation_angle: 0.0,
            scale: 1.0,
            pivot,
        }
    }
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new(Point2::origin())
    }
}

/// Maps finger events in pixel coordinates onto an `InteractionState`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureMapper {
    pub pressed_scale: f32,
    pub released_scale: f32,
}

impl GestureMapper {
    pub fn new(pressed_scale: f32) -> Self {
        Self {
            pressed_scale,
            released_scale: 1.0,
        }
    }

    pub fn on_finger_down(&self, state: &mut InteractionState, location: Point2<i32>) {
        state.scale = self.pressed_scale;
        self.on_finger_move(state, location, location);
    }

    /// Points the rotation at `new_location` as seen from the pivot.
    /// The previous location does not take part in the angle.
    pub fn on_finger_move(
        &self,
        state: &mut InteractionState,
        _old_location: Point2<i32>,
        new_location: Point2<i32>,
    ) {
        if let Some(angle) = rotation_towards(state.pivot, new_location) {
            state.rotation_angle = angle;
        } else {
            warn!("finger on pivot {:?}; keeping rotation angle", state.pivot);
        }
    }

    pub fn on_finger_up(&self, state: &mut InteractionState, _location: Point2<i32>) {
        state.scale = self.released_scale;
    }
}

impl Default for GestureMapper {
    fn default() -> Self {
        Self::new(1.5)
    }
}

/// Signed angle in degrees between screen-up and `location - pivot`.
///
/// Returns `None` when the two points coincide.
pub fn rotation_towards(pivot: Point2<i32>, location: Point2<i32>) -> Option<f32> {
    let offset = (location - pivot).cast::<f32>();
    let direction = offset.try_normalize(f32::EPSILON)?;

    // Pixel rows grow downwards
    let direction = Vector2::new(direction.x, -direction.y);

    let angle = direction.y.clamp(-1.0, 1.0).acos().to_degrees();
    Some(if direction.x > 0.0 { -angle } else { angle })
}
