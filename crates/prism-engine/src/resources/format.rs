use wgpu::TextureFormat;

use crate::error::{Error, Result};

/// Element type of CPU readback for a target format.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelKind {
    /// 8-bit unorm channels, returned as bytes.
    U8,
    /// Half floats, expanded to `f32` on readback.
    F16,
    F32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct FormatInfo {
    pub bytes_per_pixel: u32,
    pub channels: u32,
    pub kind: PixelKind,
}

/// Formats usable as render targets and textures.
pub(crate) fn format_info(format: TextureFormat) -> Result<FormatInfo> {
    use TextureFormat as F;
    let (bytes_per_pixel, channels, kind) = match format {
        F::R8Unorm => (1, 1, PixelKind::U8),
        F::Rg8Unorm => (2, 2, PixelKind::U8),
        F::Rgba8Unorm | F::Rgba8UnormSrgb | F::Bgra8Unorm | F::Bgra8UnormSrgb => {
            (4, 4, PixelKind::U8)
        }
        F::R16Float => (2, 1, PixelKind::F16),
        F::Rg16Float => (4, 2, PixelKind::F16),
        F::Rgba16Float => (8, 4, PixelKind::F16),
        F::R32Float => (4, 1, PixelKind::F32),
        F::Rg32Float => (8, 2, PixelKind::F32),
        F::Rgba32Float => (16, 4, PixelKind::F32),
        other => {
            return Err(Error::target("render target", format!("unsupported format {other:?}")));
        }
    };
    Ok(FormatInfo { bytes_per_pixel, channels, kind })
}

/// 32-bit float formats are neither filterable nor blendable without
/// optional device features.
pub(crate) fn is_filterable(format: TextureFormat) -> bool {
    !matches!(
        format,
        TextureFormat::R32Float | TextureFormat::Rg32Float | TextureFormat::Rgba32Float
    )
}

pub(crate) fn is_blendable(format: TextureFormat) -> bool {
    is_filterable(format)
}

/// Texel format name as written in `texture_storage_2d<...>`.
pub(crate) fn wgsl_storage_name(format: TextureFormat) -> Option<&'static str> {
    use TextureFormat as F;
    Some(match format {
        F::Rgba8Unorm => "rgba8unorm",
        F::Bgra8Unorm => "bgra8unorm",
        F::Rgba16Float => "rgba16float",
        F::R32Float => "r32float",
        F::Rg32Float => "rg32float",
        F::Rgba32Float => "rgba32float",
        _ => return None,
    })
}

pub(crate) fn from_wgsl_storage_name(name: &str) -> Option<TextureFormat> {
    use TextureFormat as F;
    Some(match name {
        "rgba8unorm" => F::Rgba8Unorm,
        "bgra8unorm" => F::Bgra8Unorm,
        "rgba16float" => F::Rgba16Float,
        "r32float" => F::R32Float,
        "rg32float" => F::Rg32Float,
        "rgba32float" => F::Rgba32Float,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_kinds_follow_bit_depth() {
        assert_eq!(format_info(TextureFormat::Rgba8Unorm).unwrap().kind, PixelKind::U8);
        assert_eq!(format_info(TextureFormat::Rgba16Float).unwrap().kind, PixelKind::F16);
        let r32 = format_info(TextureFormat::R32Float).unwrap();
        assert_eq!((r32.kind, r32.channels, r32.bytes_per_pixel), (PixelKind::F32, 1, 4));
    }

    #[test]
    fn depth_formats_are_rejected() {
        assert!(matches!(
            format_info(TextureFormat::Depth32Float),
            Err(Error::TargetCreation { .. })
        ));
    }

    #[test]
    fn storage_names_round_trip() {
        for f in [TextureFormat::Rgba8Unorm, TextureFormat::R32Float, TextureFormat::Rgba16Float] {
            let name = wgsl_storage_name(f).unwrap();
            assert_eq!(from_wgsl_storage_name(name), Some(f));
        }
        assert!(!is_filterable(TextureFormat::R32Float));
        assert!(is_filterable(TextureFormat::Rgba16Float));
    }
}
