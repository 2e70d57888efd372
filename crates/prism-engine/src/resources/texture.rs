use std::path::Path;

use wgpu::TextureFormat;

use crate::context::Context;
use crate::error::{Error, Result};

use super::ids::{ContextId, ResourceId, ResourceIds, TextureKey};
use super::sampler::SamplerOptions;
use super::target::validate_size;

/// CPU-side pixels for [`Context::texture`].
#[derive(Debug, Clone, Copy)]
pub enum TextureSource<'a> {
    /// Tightly packed RGBA8 rows.
    Rgba8 { width: u32, height: u32, data: &'a [u8] },
    /// An encoded image (PNG or JPEG).
    Encoded(&'a [u8]),
    File(&'a Path),
}

#[derive(Debug, Clone)]
pub struct TextureOptions {
    /// Upload as `Rgba8UnormSrgb` so sampling linearizes.
    pub srgb: bool,
    pub sampler: SamplerOptions,
    pub label: Option<String>,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self { srgb: false, sampler: SamplerOptions::LINEAR, label: None }
    }
}

pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub sampler: SamplerOptions,
    pub id: ResourceId,
}

struct Decoded {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

fn decode(source: TextureSource<'_>) -> Result<Decoded> {
    let img = match source {
        TextureSource::Rgba8 { width, height, data } => {
            let expected = width as usize * height as usize * 4;
            if data.len() != expected {
                return Err(Error::target(
                    "texture",
                    format!("{width}x{height} RGBA8 needs {expected} bytes, got {}", data.len()),
                ));
            }
            return Ok(Decoded { width, height, rgba: data.to_vec() });
        }
        TextureSource::Encoded(bytes) => image::load_from_memory(bytes)?,
        TextureSource::File(path) => image::open(path)?,
    };
    let rgba = img.to_rgba8();
    Ok(Decoded { width: rgba.width(), height: rgba.height(), rgba: rgba.into_raw() })
}

impl TextureEntry {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        ids: &mut ResourceIds,
        source: TextureSource<'_>,
        options: &TextureOptions,
    ) -> Result<Self> {
        let Decoded { width, height, rgba } = decode(source)?;
        validate_size(device, width, height)?;

        let format = if options.srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(options.label.as_deref().unwrap_or("prism texture")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = ids.allocate();
        log::debug!("texture {id:?} uploaded: {width}x{height} {format:?}");

        Ok(Self { texture, view, width, height, format, sampler: options.sampler, id })
    }
}

/// Handle to an immutable sampled texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    pub(crate) ctx: ContextId,
    pub(crate) key: TextureKey,
}

impl Texture {
    pub fn size(&self, ctx: &Context) -> Result<(u32, u32)> {
        let e = ctx.registry.texture(*self)?;
        Ok((e.width, e.height))
    }

    pub fn format(&self, ctx: &Context) -> Result<TextureFormat> {
        Ok(ctx.registry.texture(*self)?.format)
    }

    pub fn resource_id(&self, ctx: &Context) -> Result<ResourceId> {
        Ok(ctx.registry.texture(*self)?.id)
    }

    /// Idempotent.
    pub fn dispose(&self, ctx: &mut Context) {
        if self.ctx == ctx.id {
            ctx.registry.remove_texture(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_rgba_length_is_checked() {
        let data = [0u8; 15];
        let err = decode(TextureSource::Rgba8 { width: 2, height: 2, data: &data });
        assert!(matches!(err, Err(Error::TargetCreation { what: "texture", .. })));
    }

    #[test]
    fn encoded_png_decodes_to_rgba() {
        let mut png = Vec::new();
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let d = decode(TextureSource::Encoded(&png)).unwrap();
        assert_eq!((d.width, d.height), (3, 2));
        assert_eq!(&d.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_bytes_are_a_texture_error() {
        assert!(matches!(decode(TextureSource::Encoded(b"nope")), Err(Error::Texture(_))));
    }
}
