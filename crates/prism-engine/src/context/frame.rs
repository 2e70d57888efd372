use std::time::Instant;

use winit::dpi::PhysicalSize;

use crate::error::Result;
use crate::events::{EventKind, EventPayload, FramePhase};
use crate::resources::{RenderTarget, TargetEntry};

use super::Context;

impl Context {
    /// Marks the start of a frame. In window mode the swapchain texture is
    /// acquired here; a transient surface error leaves the frame without one
    /// and screen draws are skipped until the next `begin_frame`.
    pub fn begin_frame(&mut self) -> Result<()> {
        let start = Instant::now();
        self.profiler.begin_frame(start);
        if self.screen.is_none() {
            self.ensure_frame()?;
        }
        self.finish_frame_event(FramePhase::Begin, start);
        Ok(())
    }

    /// Presents the swapchain texture, if one was acquired, and closes the
    /// frame for the profiler.
    pub fn end_frame(&mut self) {
        let start = Instant::now();
        if let Some(frame) = self.frame.take() {
            self.gpu.present(frame);
        }
        self.profiler.end_frame(Instant::now());
        self.finish_frame_event(FramePhase::End, start);
    }

    fn finish_frame_event(&mut self, phase: FramePhase, start: Instant) {
        self.profiler.record(EventKind::Frame, start.elapsed(), false);
        self.events.emit(EventPayload::Frame { phase, frame: self.clock.frame(), time: self.clock.time() });
    }

    /// Resizes the default target: reconfigures the surface, or reallocates
    /// the headless screen target. A zero size is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.frame = None;
        if let Some(screen) = self.screen {
            let options = self.registry.target(screen)?.options.clone();
            let fresh = TargetEntry::allocate(&self.gpu, &mut self.registry.ids, width, height, options)?;
            self.registry.replace_target(screen.key, fresh);
        }
        self.gpu.resize(PhysicalSize::new(width, height));
        Ok(())
    }

    /// The offscreen default target; `None` in window mode.
    pub fn screen(&self) -> Option<RenderTarget> {
        self.screen
    }
}
