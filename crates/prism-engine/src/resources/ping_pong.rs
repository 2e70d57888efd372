use crate::context::Context;
use crate::error::Result;

use super::target::{validate_size, RenderTarget};

/// Two same-shaped targets: read last frame's result from one while writing
/// the next into the other, then [`swap`](Self::swap).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PingPongTarget {
    read: RenderTarget,
    write: RenderTarget,
}

impl PingPongTarget {
    pub(crate) fn new(read: RenderTarget, write: RenderTarget) -> Self {
        Self { read, write }
    }

    pub fn read(&self) -> RenderTarget {
        self.read
    }

    pub fn write(&self) -> RenderTarget {
        self.write
    }

    /// Exchanges the two handles. No texture data moves.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }

    pub fn size(&self, ctx: &Context) -> Result<(u32, u32)> {
        self.read.size(ctx)
    }

    /// Resizes both sides, or neither when the new size is rejected.
    pub fn resize(&self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        ctx.registry.target(self.read)?;
        ctx.registry.target(self.write)?;
        validate_size(ctx.gpu.device(), width, height)?;
        self.read.resize(ctx, width, height)?;
        self.write.resize(ctx, width, height)
    }

    /// Disposes both targets. Idempotent.
    pub fn dispose(&self, ctx: &mut Context) {
        self.read.dispose(ctx);
        self.write.dispose(ctx);
    }
}
