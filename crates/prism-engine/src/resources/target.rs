use wgpu::TextureFormat;

use crate::context::Context;
use crate::device::Gpu;
use crate::error::{Error, Result};

use super::format::{format_info, wgsl_storage_name};
use super::ids::{ContextId, ResourceId, ResourceIds, TargetKey};
use super::readback::{PendingReadback, Pixels, Region};
use super::sampler::SamplerOptions;

/// Creation options for render targets.
#[derive(Debug, Clone)]
pub struct TargetOptions {
    pub format: TextureFormat,
    /// Sampler used when the target is bound as a texture without an explicit
    /// sampler. Forced to nearest for non-filterable formats.
    pub sampler: SamplerOptions,
    /// Allow binding as a storage texture in compute programs.
    pub storage: bool,
    pub label: Option<String>,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            format: TextureFormat::Rgba8Unorm,
            sampler: SamplerOptions::LINEAR,
            storage: false,
            label: None,
        }
    }
}

impl TargetOptions {
    pub fn format(format: TextureFormat) -> Self {
        Self { format, ..Default::default() }
    }

    pub fn with_storage(mut self) -> Self {
        self.storage = true;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerOptions) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

pub(crate) struct TargetEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub options: TargetOptions,
    pub id: ResourceId,
    /// Owned by the context itself (the headless screen); caller disposal is ignored.
    pub pinned: bool,
}

impl TargetEntry {
    pub fn allocate(
        gpu: &Gpu,
        ids: &mut ResourceIds,
        width: u32,
        height: u32,
        options: TargetOptions,
    ) -> Result<Self> {
        let device = gpu.device();
        format_info(options.format)?;
        validate_size(device, width, height)?;
        if options.storage && wgsl_storage_name(options.format).is_none() {
            return Err(Error::target(
                "render target",
                format!("{:?} cannot be used as a storage texture", options.format),
            ));
        }

        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        if options.storage {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        let missing = usage - gpu.format_usages(options.format);
        if !missing.is_empty() {
            return Err(Error::target(
                "render target",
                format!("{:?} does not support {missing:?} on this device", options.format),
            ));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(options.label.as_deref().unwrap_or("prism target")),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: options.format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = ids.allocate();
        log::debug!("target {id:?} allocated: {width}x{height} {:?}", options.format);

        Ok(Self { texture, view, width, height, options, id, pinned: false })
    }

    pub fn format(&self) -> TextureFormat {
        self.options.format
    }
}

pub(crate) fn validate_size(device: &wgpu::Device, width: u32, height: u32) -> Result<()> {
    let max = device.limits().max_texture_dimension_2d;
    if width == 0 || height == 0 {
        return Err(Error::target("render target", format!("zero-sized {width}x{height}")));
    }
    if width > max || height > max {
        return Err(Error::target(
            "render target",
            format!("{width}x{height} exceeds the device limit of {max}"),
        ));
    }
    Ok(())
}

/// Handle to a 2D render target owned by a [`Context`].
///
/// The handle is stable across [`resize`](Self::resize); the underlying GPU
/// allocation, and therefore [`resource_id`](Self::resource_id), is not.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    pub(crate) ctx: ContextId,
    pub(crate) key: TargetKey,
}

impl RenderTarget {
    pub fn size(&self, ctx: &Context) -> Result<(u32, u32)> {
        let e = ctx.registry.target(*self)?;
        Ok((e.width, e.height))
    }

    pub fn format(&self, ctx: &Context) -> Result<TextureFormat> {
        Ok(ctx.registry.target(*self)?.format())
    }

    pub fn resource_id(&self, ctx: &Context) -> Result<ResourceId> {
        Ok(ctx.registry.target(*self)?.id)
    }

    pub fn is_disposed(&self, ctx: &Context) -> bool {
        matches!(ctx.registry.target(*self), Err(Error::Disposed(_)))
    }

    /// Reallocates the backing texture. Contents are not preserved.
    pub fn resize(&self, ctx: &mut Context, width: u32, height: u32) -> Result<()> {
        let options = ctx.registry.target(*self)?.options.clone();
        let fresh = TargetEntry::allocate(&ctx.gpu, &mut ctx.registry.ids, width, height, options)?;
        ctx.registry.replace_target(self.key, fresh);
        Ok(())
    }

    /// Copies `region` (the whole target when `None`) back to the CPU.
    pub fn read_pixels(&self, ctx: &Context, region: Option<Region>) -> Result<PendingReadback<Pixels>> {
        let e = ctx.registry.target(*self)?;
        PendingReadback::texture(ctx.gpu.device(), ctx.gpu.queue(), &e.texture, e.width, e.height, e.format(), region)
    }

    /// Releases the GPU texture. Disposing twice is a no-op.
    pub fn dispose(&self, ctx: &mut Context) {
        if self.ctx == ctx.id {
            ctx.registry.remove_target(self.key);
        }
    }
}
