use crate::binding::Uniforms;
use crate::context::Context;
use crate::error::Result;
use crate::resources::ids::{ContextId, ProgramKey};

use super::blend::BlendMode;
use super::handle::program_handle;
use super::program::ProgramKind;
use super::submit::{program, program_mut};

#[derive(Debug, Clone)]
pub struct MaterialOptions {
    pub label: Option<String>,
    pub uniforms: Uniforms,
    pub blend: BlendMode,
    pub topology: wgpu::PrimitiveTopology,
    pub vertex_count: u32,
    /// Zero is legal and draws nothing.
    pub instances: u32,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            label: None,
            uniforms: Uniforms::new(),
            blend: BlendMode::None,
            topology: wgpu::PrimitiveTopology::TriangleList,
            vertex_count: 3,
            instances: 1,
        }
    }
}

impl MaterialOptions {
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

    pub fn with_topology(mut self, topology: wgpu::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_vertex_count(mut self, vertex_count: u32) -> Self {
        self.vertex_count = vertex_count;
        self
    }

    pub fn with_instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }
}

/// Caller vertex + fragment shaders without vertex buffers. Geometry comes
/// from `@builtin(vertex_index)` / `@builtin(instance_index)`, typically
/// indexing a storage buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Material {
    pub(crate) ctx: ContextId,
    pub(crate) key: ProgramKey,
}

impl Material {
    pub fn draw(&self, ctx: &mut Context) -> Result<()> {
        super::submit::draw(ctx, self.ctx, self.key, "material")
    }

    pub fn vertex_count(&self, ctx: &Context) -> Result<u32> {
        match &program(ctx, self.ctx, self.key, "material")?.kind {
            ProgramKind::Material { vertex_count, .. } => Ok(*vertex_count),
            _ => Ok(0),
        }
    }

    pub fn instances(&self, ctx: &Context) -> Result<u32> {
        match &program(ctx, self.ctx, self.key, "material")?.kind {
            ProgramKind::Material { instances, .. } => Ok(*instances),
            _ => Ok(0),
        }
    }

    pub fn set_vertex_count(&self, ctx: &mut Context, count: u32) -> Result<()> {
        if let ProgramKind::Material { vertex_count, .. } = &mut program_mut(ctx, self.ctx, self.key, "material")?.kind {
            *vertex_count = count;
        }
        Ok(())
    }

    pub fn set_instances(&self, ctx: &mut Context, count: u32) -> Result<()> {
        if let ProgramKind::Material { instances, .. } = &mut program_mut(ctx, self.ctx, self.key, "material")?.kind {
            *instances = count;
        }
        Ok(())
    }
}

program_handle!(Material, "material");
