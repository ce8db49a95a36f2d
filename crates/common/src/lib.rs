//! Shared value types: transforms and lighting.
//!
//! These are plain data holders. The render core reads them to build
//! per-frame uniforms; nothing here touches the GPU.

mod types;

pub use types::{Light, Transform};
