use glam::{Mat4, Vec3};

use crate::config::HeroConfig;

/// Perspective camera looking down its local -Z axis.
///
/// Changing [`aspect`](Self::aspect) or the clipping planes has no effect on
/// [`projection`](Self::projection) until [`update_projection_matrix`] is
/// called.
///
/// [`update_projection_matrix`]: Self::update_projection_matrix
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &HeroConfig, width: u32, height: u32) -> Self {
        let mut camera = Self::new(
            config.fov_degrees,
            aspect_ratio(width, height),
            config.near,
            config.far,
        );
        camera.position = config.camera_position;
        camera
    }

    /// Recomputes the projection from the current field of view, aspect and
    /// clipping planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        );
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(self.position).inverse()
    }
}

pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
