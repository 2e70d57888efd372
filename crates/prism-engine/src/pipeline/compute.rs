use crate::binding::Uniforms;
use crate::context::Context;
use crate::error::Result;
use crate::resources::ids::{ContextId, ProgramKey};

use super::handle::program_handle;
use super::program::ProgramKind;
use super::submit::program;

#[derive(Debug, Clone, Default)]
pub struct ComputeOptions {
    pub label: Option<String>,
    pub uniforms: Uniforms,
}

impl ComputeOptions {
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
}

/// A `@compute` entry point dispatched in workgroups.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Compute {
    pub(crate) ctx: ContextId,
    pub(crate) key: ProgramKey,
}

impl Compute {
    pub fn dispatch(&self, ctx: &mut Context, x: u32, y: u32, z: u32) -> Result<()> {
        super::submit::dispatch(ctx, self.ctx, self.key, [x, y, z])
    }

    /// `@workgroup_size` of the entry point when written as literals.
    pub fn workgroup_size(&self, ctx: &Context) -> Result<Option<[u32; 3]>> {
        match &program(ctx, self.ctx, self.key, "compute")?.kind {
            ProgramKind::Compute { workgroup_size, .. } => Ok(*workgroup_size),
            _ => Ok(None),
        }
    }

    /// Dispatches enough workgroups to cover `width` x `height` invocations.
    pub fn dispatch_for(&self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        let [wx, wy, _] = self.workgroup_size(ctx)?.unwrap_or([1, 1, 1]);
        self.dispatch(ctx, width.div_ceil(wx.max(1)), height.div_ceil(wy.max(1)), 1)
    }
}

program_handle!(Compute, "compute");
