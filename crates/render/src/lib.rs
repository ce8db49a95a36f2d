//! Rendering core: GPU resource caches and scene composition.
//!
//! Everything GPU-facing goes through the [`GpuBackend`] trait, which hands
//! out plain `Copy` handles. A [`GraphicsContext`] owns the backend and four
//! caches (vertex buffers, programs, vertex layouts, textures); renderables
//! hold handles into those caches and never own GPU memory.
//!
//! # Invariants
//! - At most one upload per mesh kind, one compile per program name, one
//!   layout per (program, mesh kind) pair and one upload per texture name.
//! - After teardown every cache answers with [`RenderError::Released`].
//! - Raster state is set once, before the first resource is created.

mod backend;
pub mod cache;
mod camera;
mod config;
mod context;
mod error;
mod recording;
mod renderable;
mod scene;
mod shaders;

pub use backend::{
    BoundAttribute, BufferHandle, DrawCall, DrawUniforms, GlobalState, GpuBackend, GpuError,
    LayoutDesc, LayoutHandle, ProgramHandle, TextureHandle,
};
pub use cache::{
    BufferCache, GpuLayout, GpuMesh, GpuTexture, LayoutCache, Program, ProgramCache, TextureCache,
};
pub use camera::FlyCamera;
pub use config::{CameraConfig, DEFAULT_CONFIG_FILE, ViewerConfig, WindowConfig};
pub use context::{GraphicsContext, RenderableDesc};
pub use error::{ConfigError, RenderError};
pub use recording::{GpuCommand, RecordingBackend};
pub use renderable::{FrameUniforms, Renderable};
pub use scene::{AssetPolicy, FrameStats, ObjectDescription, Scene, SceneDescription, SkyboxStyle};
pub use shaders::{DepthMode, ProgramAttribute, ProgramSource, ShaderLibrary, TextureBinding};
