use crate::context::Context;
use crate::error::Result;

use super::ids::{ContextId, ResourceId, SamplerKey};

/// Filter and wrap configuration of a sampler.
///
/// Samplers are deduplicated by these options: creating the same options
/// twice yields handles to one GPU sampler with a reference count of two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerOptions {
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
}

impl SamplerOptions {
    pub const LINEAR: Self = Self {
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    pub const NEAREST: Self = Self {
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    pub fn with_address_mode(mut self, address_mode: wgpu::AddressMode) -> Self {
        self.address_mode = address_mode;
        self
    }

    /// Same wrapping with both filters forced to nearest.
    pub fn nearest(self) -> Self {
        Self {
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..self
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.mag_filter == wgpu::FilterMode::Linear || self.min_filter == wgpu::FilterMode::Linear
    }

    pub(crate) fn create(&self, device: &wgpu::Device) -> wgpu::Sampler {
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism sampler"),
            address_mode_u: self.address_mode,
            address_mode_v: self.address_mode,
            address_mode_w: self.address_mode,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            ..Default::default()
        })
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::LINEAR
    }
}

/// One GPU sampler shared by every handle with equal options.
pub(crate) struct SamplerEntry {
    pub sampler: wgpu::Sampler,
    /// Outstanding caller handles.
    pub refs: u32,
    /// Held by the context for implicit texture samplers.
    pub pinned: bool,
    pub id: ResourceId,
}

/// Handle to a deduplicated sampler. Each `create_sampler` call returns a
/// distinct handle; equal options share one GPU sampler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sampler {
    pub(crate) ctx: ContextId,
    pub(crate) key: SamplerKey,
}

impl Sampler {
    pub fn options(&self, ctx: &Context) -> Result<SamplerOptions> {
        ctx.registry.sampler_options(*self)
    }

    /// Drops this handle's reference. The GPU sampler is released once no
    /// handle and no implicit texture binding uses it. Idempotent.
    pub fn dispose(&self, ctx: &mut Context) {
        if self.ctx != ctx.id {
            return;
        }
        ctx.registry.release_sampler(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_keeps_wrapping() {
        let opts = SamplerOptions::LINEAR.with_address_mode(wgpu::AddressMode::Repeat);
        let n = opts.nearest();
        assert_eq!(n.address_mode, wgpu::AddressMode::Repeat);
        assert!(!n.is_filtering());
        assert!(opts.is_filtering());
    }

    #[test]
    fn options_hash_by_value() {
        use std::collections::HashSet;
        let set: HashSet<_> = [SamplerOptions::LINEAR, SamplerOptions::default(), SamplerOptions::NEAREST]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }
}
