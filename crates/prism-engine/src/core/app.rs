use winit::event::WindowEvent;

use crate::context::Context;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once after the context is created, before the first frame.
    /// Create targets and programs here.
    fn setup(&mut self, ctx: &mut Context) -> anyhow::Result<()>;

    /// Called for window events, before the runtime handles resize and close.
    fn on_window_event(&mut self, ctx: &mut Context, event: &WindowEvent) -> AppControl {
        let _ = (ctx, event);
        AppControl::Continue
    }

    /// Called once per rendered frame, between `begin_frame` and `end_frame`.
    fn on_frame(&mut self, frame: &mut FrameCtx<'_>) -> AppControl;
}
