//! Pinhole camera.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Camera as the raygen program reads it from the launch parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CameraParams {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    /// Half-width of the image plane at unit distance, pointing right.
    pub horizontal: [f32; 3],
    /// Half-height of the image plane at unit distance, pointing up.
    pub vertical: [f32; 3],
    pub width: i32,
    pub height: i32,
}

/// Look-at camera with a vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub from: Vec3,
    pub at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub vfov: f32,
}

impl Camera {
    pub fn new(from: Vec3, at: Vec3, up: Vec3, vfov: f32) -> Self {
        Self { from, at, up, vfov }
    }

    /// Frame for a `width` x `height` image.
    pub fn params(&self, width: u32, height: u32) -> CameraParams {
        let direction = (self.at - self.from).normalize_or_zero();
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        let half_height = (self.vfov.to_radians() * 0.5).tan();
        let horizontal = half_height * aspect * direction.cross(self.up).normalize_or_zero();
        let vertical = half_height * horizontal.cross(direction).normalize_or_zero();

        CameraParams {
            position: self.from.to_array(),
            direction: direction.to_array(),
            horizontal: horizontal.to_array(),
            vertical: vertical.to_array(),
            width: width as i32,
            height: height as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_camera() -> Camera {
        Camera::new(Vec3::new(-10.0, 2.0, -12.0), Vec3::ZERO, Vec3::Y, 40.0)
    }

    #[test]
    fn params_are_56_bytes() {
        assert_eq!(std::mem::size_of::<CameraParams>(), 56);
        assert_eq!(std::mem::offset_of!(CameraParams, width), 48);
    }

    #[test]
    fn basis_is_orthogonal() {
        let params = sample_camera().params(1200, 1024);
        let direction = Vec3::from(params.direction);
        let horizontal = Vec3::from(params.horizontal);
        let vertical = Vec3::from(params.vertical);

        assert_relative_eq!(direction.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(direction.dot(horizontal), 0.0, epsilon = 1e-5);
        assert_relative_eq!(direction.dot(vertical), 0.0, epsilon = 1e-5);
        assert_relative_eq!(horizontal.dot(vertical), 0.0, epsilon = 1e-5);
        assert!(vertical.y > 0.0);
    }

    #[test]
    fn extent_follows_fov_and_aspect() {
        let params = sample_camera().params(1200, 1024);
        let half_height = 20.0f32.to_radians().tan();
        assert_relative_eq!(Vec3::from(params.vertical).length(), half_height, epsilon = 1e-5);
        assert_relative_eq!(
            Vec3::from(params.horizontal).length(),
            half_height * 1200.0 / 1024.0,
            epsilon = 1e-5
        );
        assert_eq!((params.width, params.height), (1200, 1024));
    }
}
