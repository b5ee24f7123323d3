/// Quaternion helpers for orientation animation
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use std::f32::consts::PI;

/// Below this angle-cosine distance slerp degrades to normalized lerp
const SLERP_LERP_THRESHOLD: f32 = 1e-4;

/// Shortest rotation carrying direction `from` onto direction `to`.
///
/// Antiparallel inputs have no unique shortest rotation; those resolve to a
/// half turn about an axis orthogonal to `from`.
pub fn from_vectors(from: &Vector3<f32>, to: &Vector3<f32>) -> UnitQuaternion<f32> {
    let from = from.normalize();
    let to = to.normalize();

    let d = from.dot(&to);
    if d < -1.0 + 1e-6 {
        let mut axis = from.cross(&Vector3::x());
        if axis.norm_squared() < 1e-6 {
            axis = from.cross(&Vector3::z());
        }
        return UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), PI);
    }

    let c = from.cross(&to);
    let s = ((1.0 + d) * 2.0).sqrt();
    UnitQuaternion::new_normalize(Quaternion::new(s / 2.0, c.x / s, c.y / s, c.z / s))
}

/// Spherical linear interpolation from `start` (t = 0) to `end` (t = 1)
/// along the shorter arc.
pub fn slerp(start: &UnitQuaternion<f32>, end: &UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    let a = start.coords;
    let mut b = end.coords;

    let mut cos_theta = a.dot(&b);
    if cos_theta < 0.0 {
        b = -b;
        cos_theta = -cos_theta;
    }

    let coords = if cos_theta > 1.0 - SLERP_LERP_THRESHOLD {
        a * (1.0 - t) + b * t
    } else {
        let theta = cos_theta.min(1.0).acos();
        let sin_theta = theta.sin();
        a * (((1.0 - t) * theta).sin() / sin_theta) + b * ((t * theta).sin() / sin_theta)
    };

    UnitQuaternion::new_normalize(Quaternion::from_vector(coords))
}
