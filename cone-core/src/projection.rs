/// Camera projection utilities
use nalgebra::Matrix4;

/// Clip planes of a perspective frustum, in view space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumPlanes {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl FrustumPlanes {
    pub fn new(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
            near,
            far,
        }
    }

    /// Off-axis perspective matrix mapping the frustum to the GL clip cube
    /// (depth in [-1, 1]).
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let Self {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;

        #[rustfmt::skip]
        let m = Matrix4::new(
            2.0 * n / (r - l), 0.0,               (r + l) / (r - l),  0.0,
            0.0,               2.0 * n / (t - b), (t + b) / (t - b),  0.0,
            0.0,               0.0,               -(f + n) / (f - n), -2.0 * f * n / (f - n),
            0.0,               0.0,               -1.0,               0.0,
        );
        m
    }
}

impl Default for FrustumPlanes {
    /// A portrait 2:3 view volume spanning depths 5 to 10
    fn default() -> Self {
        Self::new(-1.6, 1.6, -2.4, 2.4, 5.0, 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_near_and_far_map_to_clip_bounds() {
        let projection = FrustumPlanes::default().projection_matrix();
        let near = projection.transform_point(&Point3::new(0.0, 0.0, -5.0));
        let far = projection.transform_point(&Point3::new(0.0, 0.0, -10.0));
        assert!((near.z + 1.0).abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_frustum_corner_maps_to_ndc_corner() {
        let projection = FrustumPlanes::default().projection_matrix();
        let corner = projection.transform_point(&Point3::new(1.6, 2.4, -5.0));
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y - 1.0).abs() < 1e-5);
    }
}
