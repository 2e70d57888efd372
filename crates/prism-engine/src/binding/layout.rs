//! Bind group layout entries synthesized from a [`BindingPlan`].

use std::num::NonZeroU64;

use prism_wgsl::Access;

use super::kind::UniformKind;
use super::packing::slot_size;
use super::plan::{BindingPlan, ProgramStage};

fn visibility(stage: ProgramStage, kind: &UniformKind) -> wgpu::ShaderStages {
    match stage {
        ProgramStage::Compute => wgpu::ShaderStages::COMPUTE,
        // Writable resources are not allowed in vertex shaders.
        ProgramStage::Raster => match kind {
            UniformKind::StorageTexture { .. } | UniformKind::StorageBuffer { read_only: false } => {
                wgpu::ShaderStages::FRAGMENT
            }
            _ => wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        },
    }
}

fn uniform_buffer(size: u64) -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: NonZeroU64::new(size),
    }
}

fn binding_type(kind: &UniformKind) -> wgpu::BindingType {
    match kind {
        UniformKind::Texture { sample_type } => wgpu::BindingType::Texture {
            sample_type: *sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        UniformKind::Sampler { filtering: true } => {
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        }
        UniformKind::Sampler { filtering: false } => {
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering)
        }
        UniformKind::StorageBuffer { read_only } => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: *read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        UniformKind::StorageTexture { format, access } => wgpu::BindingType::StorageTexture {
            access: match access {
                Access::Read => wgpu::StorageTextureAccess::ReadOnly,
                Access::Write => wgpu::StorageTextureAccess::WriteOnly,
                Access::ReadWrite => wgpu::StorageTextureAccess::ReadWrite,
            },
            format: *format,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        data => uniform_buffer(slot_size(data)),
    }
}

/// The group-0 layout, shared by every program that reads `globals`.
pub(crate) fn globals_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
        ty: uniform_buffer(std::mem::size_of::<super::GlobalsUniform>() as u64),
        count: None,
    }]
}

/// The group-1 layout of `plan`, ordered by binding.
pub(crate) fn local_entries(plan: &BindingPlan) -> Vec<wgpu::BindGroupLayoutEntry> {
    let stage = plan.stage();
    let block = plan.block().map(|b| wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: match stage {
            ProgramStage::Compute => wgpu::ShaderStages::COMPUTE,
            ProgramStage::Raster => wgpu::ShaderStages::VERTEX_FRAGMENT,
        },
        ty: uniform_buffer(u64::from(b.size)),
        count: None,
    });
    let slots = plan.slots().iter().map(|s| wgpu::BindGroupLayoutEntry {
        binding: s.binding,
        visibility: visibility(stage, &s.kind),
        ty: binding_type(&s.kind),
        count: None,
    });
    block.into_iter().chain(slots).collect()
}
