use crate::config::CameraConfig;
use crate::renderable::FrameUniforms;
use glam::{Mat4, Vec3};
use skyview_common::Light;

/// Free-fly camera with position, yaw, pitch, and projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 800.0 / 600.0)
    }
}

impl FlyCamera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            yaw: config.yaw_degrees.to_radians(),
            pitch: config.pitch_degrees.to_radians(),
            fov: config.fov_degrees.to_radians(),
            aspect,
            near: config.near,
            far: config.far,
            speed: config.speed,
            sensitivity: config.sensitivity.to_radians(),
        }
    }

    /// Updates the aspect ratio after a resize. Zero-sized windows are ignored.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Moves along the camera's local axes.
    ///
    /// `direction` is (right, up, forward) in the range -1..=1 per axis;
    /// `boost` scales the speed for this step only.
    pub fn apply_movement(&mut self, direction: Vec3, boost: f32, dt: f32) {
        if direction == Vec3::ZERO {
            return;
        }
        let step = self.speed * boost * dt;
        self.position += self.right() * direction.x * step;
        self.position += Vec3::Y * direction.y * step;
        self.position += self.forward() * direction.z * step;
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self
            .pitch
            .clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Camera and light values shared by every draw of one frame.
    pub fn frame_uniforms(&self, light: &Light) -> FrameUniforms {
        FrameUniforms {
            projection: self.projection_matrix(),
            view: self.view_matrix(),
            camera_position: self.position,
            light: *light,
        }
    }
}
