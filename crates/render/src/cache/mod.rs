//! Named GPU resource caches.
//!
//! Each cache loads a resource on first request, hands out the same handle on
//! every later request, and releases everything it owns exactly once. Any
//! request after release is a [`RenderError::Released`](crate::RenderError).

mod buffer;
mod layout;
mod program;
mod texture;

pub use buffer::{BufferCache, GpuMesh};
pub use layout::{GpuLayout, LayoutCache};
pub use program::{Program, ProgramCache};
pub use texture::{GpuTexture, TextureCache};
