use prism_wgsl::{Access, Scalar, WgslType};
use wgpu::TextureFormat;

use crate::resources::format::wgsl_storage_name;

use super::value::{BindingValue, UniformValue};

/// Shape of one binding as the pipeline layout sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Scalar(Scalar),
    Vector { size: u8, scalar: Scalar },
    Mat3,
    Mat4,
    Texture { sample_type: wgpu::TextureSampleType },
    Sampler { filtering: bool },
    StorageBuffer { read_only: bool },
    StorageTexture { format: TextureFormat, access: Access },
}

impl UniformKind {
    pub fn is_plain_data(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Vector { .. } | Self::Mat3 | Self::Mat4)
    }

    /// `(align, size)` under WGSL uniform address-space rules.
    pub(crate) fn uniform_layout(&self) -> Option<(u32, u32)> {
        Some(match self {
            Self::Scalar(Scalar::F16) => (2, 2),
            Self::Scalar(_) => (4, 4),
            Self::Vector { size: 2, .. } => (8, 8),
            Self::Vector { size: 3, .. } => (16, 12),
            Self::Vector { .. } => (16, 16),
            Self::Mat3 => (16, 48),
            Self::Mat4 => (16, 64),
            _ => return None,
        })
    }

    /// Kind inferred from a caller value when the source declares nothing.
    pub(crate) fn infer(value: &UniformValue) -> Self {
        match value {
            UniformValue::Float(_) => Self::Scalar(Scalar::F32),
            UniformValue::Int(_) => Self::Scalar(Scalar::I32),
            UniformValue::Uint(_) => Self::Scalar(Scalar::U32),
            UniformValue::Vec2(_) => Self::Vector { size: 2, scalar: Scalar::F32 },
            UniformValue::Vec3(_) => Self::Vector { size: 3, scalar: Scalar::F32 },
            UniformValue::Vec4(_) => Self::Vector { size: 4, scalar: Scalar::F32 },
            UniformValue::Mat3(_) => Self::Mat3,
            UniformValue::Mat4(_) => Self::Mat4,
        }
    }

    /// Maps a plain-data WGSL type. `None` for anything the packer cannot fill.
    pub(crate) fn from_data_type(ty: &WgslType) -> Option<Self> {
        match ty {
            WgslType::Scalar(Scalar::Bool) => None,
            WgslType::Scalar(s) => Some(Self::Scalar(*s)),
            WgslType::Vector { scalar: Scalar::Bool, .. } => None,
            WgslType::Vector { size, scalar } => Some(Self::Vector { size: *size, scalar: *scalar }),
            WgslType::Matrix { columns: 3, rows: 3 } => Some(Self::Mat3),
            WgslType::Matrix { columns: 4, rows: 4 } => Some(Self::Mat4),
            _ => None,
        }
    }

    /// `true` when `value` can fill a slot of this kind.
    pub(crate) fn accepts(&self, value: &BindingValue) -> bool {
        match (self, value) {
            (Self::Scalar(_), BindingValue::Uniform(v)) => v.len() == 1,
            (Self::Vector { size, .. }, BindingValue::Uniform(v)) => {
                v.len() == *size as usize && !matches!(v, UniformValue::Int(_) | UniformValue::Uint(_))
            }
            (Self::Mat3, BindingValue::Uniform(UniformValue::Mat3(_))) => true,
            (Self::Mat4, BindingValue::Uniform(UniformValue::Mat4(_))) => true,
            (Self::Texture { .. }, BindingValue::Texture(_)) => true,
            (Self::Sampler { .. }, BindingValue::Sampler(_)) => true,
            (Self::StorageBuffer { .. }, BindingValue::Storage(_)) => true,
            (Self::StorageTexture { .. }, BindingValue::StorageTexture(_)) => true,
            _ => false,
        }
    }

    /// WGSL spelling used when auto-declaring a binding.
    pub(crate) fn wgsl_type(&self) -> String {
        match self {
            Self::Scalar(s) => s.wgsl_name().to_string(),
            Self::Vector { size, scalar } => format!("vec{size}<{}>", scalar.wgsl_name()),
            Self::Mat3 => "mat3x3<f32>".into(),
            Self::Mat4 => "mat4x4<f32>".into(),
            Self::Texture { sample_type } => match sample_type {
                wgpu::TextureSampleType::Uint => "texture_2d<u32>".into(),
                wgpu::TextureSampleType::Sint => "texture_2d<i32>".into(),
                _ => "texture_2d<f32>".into(),
            },
            Self::Sampler { .. } => "sampler".into(),
            Self::StorageBuffer { .. } => "array<f32>".into(),
            Self::StorageTexture { format, access } => format!(
                "texture_storage_2d<{}, {}>",
                wgsl_storage_name(*format).unwrap_or("rgba8unorm"),
                access.wgsl_name()
            ),
        }
    }

    /// Address-space qualifier for an auto-declared `var`.
    pub(crate) fn wgsl_space(&self) -> &'static str {
        match self {
            k if k.is_plain_data() => "<uniform>",
            Self::StorageBuffer { read_only: true } => "<storage, read>",
            Self::StorageBuffer { read_only: false } => "<storage, read_write>",
            _ => "",
        }
    }
}

/// Public description of one caller-visible binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformDescriptor {
    pub name: String,
    pub kind: UniformKind,
    /// Element count of fixed-size declared arrays.
    pub array_size: Option<u32>,
}
