/// Device orientation changes and the quaternion animation between them
use log::debug;
use nalgebra::{UnitQuaternion, Vector3};

use crate::error::OrientationError;
use crate::quaternion;

/// Physical orientation reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceOrientation {
    #[default]
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    /// Direction the cone's apex should point for this orientation
    pub fn direction(self) -> Vector3<f32> {
        match self {
            DeviceOrientation::Unknown | DeviceOrientation::Portrait => Vector3::new(0.0, 1.0, 0.0),
            DeviceOrientation::PortraitUpsideDown => Vector3::new(0.0, -1.0, 0.0),
            DeviceOrientation::FaceDown => Vector3::new(0.0, 0.0, -1.0),
            DeviceOrientation::FaceUp => Vector3::new(0.0, 0.0, 1.0),
            DeviceOrientation::LandscapeLeft => Vector3::new(1.0, 0.0, 0.0),
            DeviceOrientation::LandscapeRight => Vector3::new(-1.0, 0.0, 0.0),
        }
    }
}

impl TryFrom<u32> for DeviceOrientation {
    type Error = OrientationError;

    /// Platform codes, in the order mobile platforms enumerate them
    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DeviceOrientation::Unknown),
            1 => Ok(DeviceOrientation::Portrait),
            2 => Ok(DeviceOrientation::PortraitUpsideDown),
            3 => Ok(DeviceOrientation::LandscapeLeft),
            4 => Ok(DeviceOrientation::LandscapeRight),
            5 => Ok(DeviceOrientation::FaceUp),
            6 => Ok(DeviceOrientation::FaceDown),
            other => Err(OrientationError::Unrecognized(other)),
        }
    }
}

/// Interpolation between two orientations over a fixed duration.
///
/// At rest once `current == end`; `advance` is a no-op until the next
/// `begin_transition`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationAnimation {
    start: UnitQuaternion<f32>,
    end: UnitQuaternion<f32>,
    current: UnitQuaternion<f32>,
    elapsed: f32,
    duration: f32,
}

impl OrientationAnimation {
    pub fn new(duration: f32) -> Self {
        Self {
            start: UnitQuaternion::identity(),
            end: UnitQuaternion::identity(),
            current: UnitQuaternion::identity(),
            elapsed: 0.0,
            duration,
        }
    }

    pub fn start(&self) -> UnitQuaternion<f32> {
        self.start
    }

    pub fn end(&self) -> UnitQuaternion<f32> {
        self.end
    }

    pub fn current(&self) -> UnitQuaternion<f32> {
        self.current
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_at_rest(&self) -> bool {
        self.current == self.end
    }

    /// Start animating from the previous target towards `direction`.
    ///
    /// Any in-flight interpolation is abandoned; the new start is the old end,
    /// not the partially interpolated orientation.
    pub fn begin_transition(&mut self, direction: &Vector3<f32>) {
        let up = Vector3::new(0.0, 1.0, 0.0);
        self.elapsed = 0.0;
        self.start = self.end;
        self.current = self.end;
        self.end = quaternion::from_vectors(&up, direction);
        debug!("orientation transition towards {:?}", direction.as_slice());
    }

    pub fn advance(&mut self, time_step: f32) {
        if self.is_at_rest() {
            return;
        }

        self.elapsed += time_step;
        if self.elapsed >= self.duration {
            self.current = self.end;
        } else {
            let mu = self.elapsed / self.duration;
            self.current = quaternion::slerp(&self.start, &self.end, mu);
        }
    }
}

impl Default for OrientationAnimation {
    fn default() -> Self {
        Self::new(0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_codes() {
        assert_eq!(DeviceOrientation::try_from(3), Ok(DeviceOrientation::LandscapeLeft));
        assert_eq!(DeviceOrientation::try_from(6), Ok(DeviceOrientation::FaceDown));
        assert_eq!(
            DeviceOrientation::try_from(7),
            Err(OrientationError::Unrecognized(7))
        );
    }

    #[test]
    fn test_unknown_maps_to_portrait() {
        assert_eq!(
            DeviceOrientation::Unknown.direction(),
            DeviceOrientation::Portrait.direction()
        );
    }

    #[test]
    fn test_starts_at_rest() {
        let mut animation = OrientationAnimation::default();
        assert!(animation.is_at_rest());
        animation.advance(1.0);
        assert_eq!(animation.elapsed(), 0.0);
    }

    #[test]
    fn test_begin_transition_twice_is_idempotent() {
        let mut animation = OrientationAnimation::default();
        let target = DeviceOrientation::FaceUp.direction();

        animation.begin_transition(&target);
        let first_end = animation.end();
        assert_eq!(animation.elapsed(), 0.0);

        animation.begin_transition(&target);
        assert_eq!(animation.end(), first_end);
        assert_eq!(animation.elapsed(), 0.0);
    }

    #[test]
    fn test_advance_approaches_end_monotonically() {
        let mut animation = OrientationAnimation::default();
        animation.begin_transition(&DeviceOrientation::LandscapeRight.direction());

        let mut last = animation.current().angle_to(&animation.end());
        for _ in 0..4 {
            animation.advance(0.05);
            let distance = animation.current().angle_to(&animation.end());
            assert!(distance < last);
            last = distance;
        }
        assert!(!animation.is_at_rest());
    }

    #[test]
    fn test_advance_past_duration_snaps_to_end() {
        let mut animation = OrientationAnimation::default();
        animation.begin_transition(&DeviceOrientation::FaceDown.direction());
        animation.advance(0.1);
        animation.advance(0.2);

        assert_eq!(animation.current(), animation.end());
        assert!(animation.is_at_rest());

        let elapsed = animation.elapsed();
        animation.advance(0.1);
        assert_eq!(animation.elapsed(), elapsed);
    }

    #[test]
    fn test_new_transition_starts_from_previous_end() {
        let mut animation = OrientationAnimation::default();
        animation.begin_transition(&DeviceOrientation::LandscapeLeft.direction());
        let landscape = animation.end();
        animation.advance(0.1);

        animation.begin_transition(&DeviceOrientation::Portrait.direction());
        assert_eq!(animation.start(), landscape);
        assert_eq!(animation.current(), landscape);
        assert!(animation.end().angle() < 1e-6);
    }
}
