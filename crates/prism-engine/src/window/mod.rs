//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to a [`Context`](crate::Context).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
