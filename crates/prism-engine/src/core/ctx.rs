use winit::window::{Window, WindowId};

use crate::context::Context;
use crate::time::ClockSnapshot;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Returns the logical window size as `(width, height)` in logical pixels.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// The clock has already been advanced and the swapchain texture acquired;
/// the frame is presented after the callback returns.
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub ctx: &'a mut Context,
    pub time: ClockSnapshot,
    pub runtime: &'a mut RuntimeCtx,
}
