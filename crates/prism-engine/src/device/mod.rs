//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain) in window mode
//! - acquiring and presenting swapchain frames

mod frame;
mod gpu;
mod init;
mod surface;

pub use frame::SurfaceFrame;
pub use gpu::Gpu;
pub use init::{GpuInit, SurfaceSource};
pub use surface::SurfaceErrorAction;
