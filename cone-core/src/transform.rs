/// Model-view transformation matrices
use nalgebra::{Matrix4, Vector3};

/// Transform builder for the cone's model-view matrix
pub struct Transform;

impl Transform {
    /// Rotation about the +Z axis (counterclockwise looking down -Z)
    pub fn rotation_matrix(degrees: f32) -> Matrix4<f32> {
        Matrix4::new_rotation(Vector3::new(0.0, 0.0, degrees.to_radians()))
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a uniform scale matrix
    pub fn scale_matrix(scale: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(scale)
    }

    /// Scale, then rotate about Z, then push the object down the view axis.
    pub fn model_view(scale: f32, rotation_degrees: f32, camera_distance: f32) -> Matrix4<f32> {
        Self::translation_matrix(0.0, 0.0, -camera_distance)
            * Self::rotation_matrix(rotation_degrees)
            * Self::scale_matrix(scale)
    }
}
