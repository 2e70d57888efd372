use crate::binding::Uniforms;
use crate::context::Context;
use crate::error::Result;
use crate::resources::ids::{ContextId, ProgramKey};

use super::blend::BlendMode;
use super::handle::program_handle;

#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    pub label: Option<String>,
    pub uniforms: Uniforms,
    pub blend: BlendMode,
}

impl PassOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_uniforms(mut self, uniforms: Uniforms) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// A fragment shader run over a full-screen triangle.
///
/// The fragment entry may take `@location(0) uv: vec2<f32>` (top-left origin)
/// and/or `@builtin(position)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pass {
    pub(crate) ctx: ContextId,
    pub(crate) key: ProgramKey,
}

impl Pass {
    /// Draws into the context's current target.
    pub fn draw(&self, ctx: &mut Context) -> Result<()> {
        super::submit::draw(ctx, self.ctx, self.key, "pass")
    }
}

program_handle!(Pass, "pass");
