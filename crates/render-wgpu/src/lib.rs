//! wgpu implementation of the skyview GPU backend.
//!
//! Handles issued by [`WgpuBackend`] index into its own resource tables. The
//! caller owns the surface: it configures it, attaches the current frame's
//! view with [`WgpuBackend::attach_target`] and presents after `end_frame`.
//!
//! # Invariants
//! - One render pipeline per vertex layout, built with the raster state set
//!   before any layout exists.
//! - Every draw in a frame gets its own uniform slot.

mod gpu;

pub use gpu::WgpuBackend;
