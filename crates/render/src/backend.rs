use crate::shaders::ProgramSource;
use bytemuck::{Pod, Zeroable};
use skyview_assets::ImageData;

/// Handle to a vertex buffer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex layout: one buffer's fields bound to one program's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutHandle(pub u32);

/// Handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Process-wide raster state, set once before any layout is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalState {
    pub depth_test: bool,
    pub cull_back_faces: bool,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            depth_test: true,
            cull_back_faces: true,
        }
    }
}

/// One buffer field routed to one program input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAttribute {
    pub location: u32,
    pub components: u32,
    /// Byte offset inside the record.
    pub offset: u64,
}

/// Everything a backend needs to build a vertex layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDesc {
    pub label: String,
    pub program: ProgramHandle,
    pub buffer: BufferHandle,
    /// Record size in bytes.
    pub stride: u64,
    pub attributes: Vec<BoundAttribute>,
}

/// Per-draw uniform block shared by every built-in program.
///
/// Matrices are column-major. `light_terms` packs ambient, diffuse and
/// specular intensities plus the texture tiling count.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    pub light_color: [f32; 4],
    pub light_terms: [f32; 4],
}

/// A single non-indexed triangle-list draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramHandle,
    pub layout: LayoutHandle,
    pub buffer: BufferHandle,
    pub vertex_count: u32,
    pub textures: &'a [TextureHandle],
    pub uniforms: DrawUniforms,
}

/// Errors raised by a backend.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("shader {name} failed to compile: {message}")]
    Compile { name: String, message: String },
    #[error("pipeline {label} rejected: {message}")]
    Pipeline { label: String, message: String },
    #[error("invalid {kind} handle {id}")]
    InvalidHandle { kind: &'static str, id: u32 },
    #[error("texture {name} is malformed: {reason}")]
    InvalidTexture { name: String, reason: String },
    #[error("cannot upload an empty vertex buffer for {0}")]
    EmptyBuffer(String),
    #[error("draw issued outside of a frame")]
    NoActiveFrame,
    #[error("frame started twice without ending")]
    FrameInProgress,
    #[error("no render target attached for this frame")]
    NoTarget,
}

/// The GPU API collaborator.
///
/// Backends own the actual GPU objects and hand out plain handles. All calls
/// come from one thread; a backend never needs interior locking.
pub trait GpuBackend {
    /// Depth test and face culling. Called once, before anything else.
    fn set_global_state(&mut self, state: GlobalState);

    fn upload_vertices(&mut self, label: &str, floats: &[f32]) -> Result<BufferHandle, GpuError>;

    fn compile_program(&mut self, program: &ProgramSource) -> Result<ProgramHandle, GpuError>;

    fn create_layout(&mut self, desc: &LayoutDesc) -> Result<LayoutHandle, GpuError>;

    fn upload_texture(&mut self, name: &str, image: &ImageData) -> Result<TextureHandle, GpuError>;

    /// Starts a frame by clearing color and depth.
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> Result<(), GpuError>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), GpuError>;

    /// Submits the frame's draws.
    fn end_frame(&mut self) -> Result<(), GpuError>;

    /// Drops the current frame's draws unsubmitted. No-op outside a frame.
    fn abort_frame(&mut self);

    fn release_buffer(&mut self, buffer: BufferHandle);

    fn release_program(&mut self, program: ProgramHandle);

    fn release_layout(&mut self, layout: LayoutHandle);

    fn release_texture(&mut self, texture: TextureHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_uniforms_fill_one_aligned_block() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 256);
    }

    #[test]
    fn global_state_defaults_enable_depth_and_culling() {
        let state = GlobalState::default();
        assert!(state.depth_test);
        assert!(state.cull_back_faces);
    }
}
