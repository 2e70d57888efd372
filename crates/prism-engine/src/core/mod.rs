//! Core engine-facing contracts.
//!
//! This module defines the interface between the window runtime and the
//! application: the per-frame context and the callbacks the runtime drives.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
