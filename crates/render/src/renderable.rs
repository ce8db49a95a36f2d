use crate::backend::{
    BufferHandle, DrawCall, DrawUniforms, GpuBackend, GpuError, LayoutHandle, ProgramHandle,
    TextureHandle,
};
use glam::{Mat4, Vec3};
use skyview_assets::MeshKind;
use skyview_common::{Light, Transform};

/// Camera and light state shared by every draw in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub camera_position: Vec3,
    pub light: Light,
}

/// One drawable scene object.
///
/// Holds plain handles into the context's caches; the caches own the GPU
/// resources. Only the transform and tiling belong to the renderable.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    pub name: String,
    pub mesh: MeshKind,
    pub program: ProgramHandle,
    pub layout: LayoutHandle,
    pub buffer: BufferHandle,
    pub vertex_count: u32,
    pub textures: Vec<TextureHandle>,
    pub transform: Transform,
    /// Texture repeat count across each face.
    pub tiling: f32,
}

impl Renderable {
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Uniforms for this object in the given frame.
    pub fn uniforms(&self, frame: &FrameUniforms) -> DrawUniforms {
        let light = &frame.light;
        DrawUniforms {
            projection: frame.projection.to_cols_array_2d(),
            view: frame.view.to_cols_array_2d(),
            model: self.transform.model_matrix().to_cols_array_2d(),
            camera_position: frame.camera_position.extend(1.0).to_array(),
            light_direction: light.to_light().extend(0.0).to_array(),
            light_color: light.color.extend(1.0).to_array(),
            light_terms: [light.ambient, light.diffuse, light.specular, self.tiling],
        }
    }

    /// Binds textures and layout, pushes refreshed uniforms and draws every vertex.
    pub fn render<B: GpuBackend + ?Sized>(
        &self,
        backend: &mut B,
        frame: &FrameUniforms,
    ) -> Result<(), GpuError> {
        backend.draw(&DrawCall {
            program: self.program,
            layout: self.layout,
            buffer: self.buffer,
            vertex_count: self.vertex_count,
            textures: &self.textures,
            uniforms: self.uniforms(frame),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderable() -> Renderable {
        Renderable {
            name: "crate".into(),
            mesh: MeshKind::Cube,
            program: ProgramHandle(1),
            layout: LayoutHandle(2),
            buffer: BufferHandle(3),
            vertex_count: 36,
            textures: vec![TextureHandle(4)],
            transform: Transform::from_position(Vec3::new(2.0, 0.0, -1.0)),
            tiling: 3.0,
        }
    }

    fn frame() -> FrameUniforms {
        FrameUniforms {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            camera_position: Vec3::new(0.0, 1.0, 5.0),
            light: Light::default(),
        }
    }

    #[test]
    fn uniforms_carry_transform_and_tiling() {
        let u = renderable().uniforms(&frame());
        assert_eq!(u.model[3], [2.0, 0.0, -1.0, 1.0]);
        assert_eq!(u.camera_position, [0.0, 1.0, 5.0, 1.0]);
        assert_eq!(u.light_terms[3], 3.0);
        assert_eq!(u.light_terms[0], Light::default().ambient);
        assert_eq!(u.light_direction[3], 0.0);
    }

    #[test]
    fn transform_updates_show_up_next_frame() {
        let mut r = renderable();
        r.set_transform(Transform::from_position(Vec3::new(0.0, 7.0, 0.0)));
        assert_eq!(r.uniforms(&frame()).model[3], [0.0, 7.0, 0.0, 1.0]);
    }

    #[test]
    fn render_outside_frame_fails() {
        let mut backend = crate::recording::RecordingBackend::new();
        assert!(matches!(
            renderable().render(&mut backend, &frame()),
            Err(GpuError::NoActiveFrame)
        ));
    }
}
