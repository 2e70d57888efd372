//! Classification of WGSL type text into the shapes the binder cares about.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    F32,
    F16,
    I32,
    U32,
    Bool,
}

impl Scalar {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "f32" => Self::F32,
            "f16" => Self::F16,
            "i32" => Self::I32,
            "u32" => Self::U32,
            "bool" => Self::Bool,
            _ => return None,
        })
    }

    fn from_suffix(c: char) -> Option<Self> {
        Some(match c {
            'f' => Self::F32,
            'h' => Self::F16,
            'i' => Self::I32,
            'u' => Self::U32,
            _ => return None,
        })
    }

    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::Bool => "bool",
        }
    }
}

/// Access mode of a storage texture or storage buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "read" => Self::Read,
            "write" => Self::Write,
            "read_write" => Self::ReadWrite,
            _ => return None,
        })
    }

    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read_write",
        }
    }
}

/// Type of a module-scope `var` as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WgslType {
    Scalar(Scalar),
    Vector { size: u8, scalar: Scalar },
    Matrix { columns: u8, rows: u8 },
    /// `texture_2d<T>`; the sampled scalar type is kept.
    Texture2d(Scalar),
    /// `texture_storage_2d<format, access>`; format is the WGSL texel format name.
    StorageTexture2d { format: String, access: Access },
    Sampler,
    SamplerComparison,
    /// `array<...>` (runtime-sized or fixed), inner text kept verbatim.
    Array(String),
    /// Anything else, typically a user struct name.
    Named(String),
}

impl WgslType {
    /// Classifies normalized type text (tokens joined without whitespace).
    pub fn parse(text: &str) -> Self {
        if let Some(s) = Scalar::parse(text) {
            return Self::Scalar(s);
        }
        if let Some(v) = parse_vector(text) {
            return v;
        }
        if let Some(m) = parse_matrix(text) {
            return m;
        }
        if let Some(inner) = generic_args(text, "texture_2d") {
            return Self::Texture2d(Scalar::parse(inner).unwrap_or(Scalar::F32));
        }
        if let Some(inner) = generic_args(text, "texture_storage_2d") {
            let mut parts = inner.split(',');
            let format = parts.next().unwrap_or_default().to_string();
            let access = parts.next().and_then(Access::parse).unwrap_or(Access::Write);
            return Self::StorageTexture2d { format, access };
        }
        match text {
            "sampler" => return Self::Sampler,
            "sampler_comparison" => return Self::SamplerComparison,
            _ => {}
        }
        if let Some(inner) = generic_args(text, "array") {
            return Self::Array(inner.to_string());
        }
        Self::Named(text.to_string())
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Texture2d(_) | Self::StorageTexture2d { .. })
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, Self::Sampler | Self::SamplerComparison)
    }
}

impl fmt::Display for WgslType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => f.write_str(s.wgsl_name()),
            Self::Vector { size, scalar } => write!(f, "vec{size}<{}>", scalar.wgsl_name()),
            Self::Matrix { columns, rows } => write!(f, "mat{columns}x{rows}<f32>"),
            Self::Texture2d(s) => write!(f, "texture_2d<{}>", s.wgsl_name()),
            Self::StorageTexture2d { format, access } => {
                write!(f, "texture_storage_2d<{format}, {}>", access.wgsl_name())
            }
            Self::Sampler => f.write_str("sampler"),
            Self::SamplerComparison => f.write_str("sampler_comparison"),
            Self::Array(inner) => write!(f, "array<{inner}>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

fn generic_args<'a>(text: &'a str, head: &str) -> Option<&'a str> {
    text.strip_prefix(head)?
        .strip_prefix('<')?
        .strip_suffix('>')
}

fn parse_vector(text: &str) -> Option<WgslType> {
    let rest = text.strip_prefix("vec")?;
    let mut chars = rest.chars();
    let size = chars.next()?.to_digit(10)? as u8;
    if !(2..=4).contains(&size) {
        return None;
    }
    let tail = chars.as_str();
    let scalar = if tail.is_empty() {
        return None;
    } else if let Some(inner) = tail.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        Scalar::parse(inner)?
    } else if tail.len() == 1 {
        Scalar::from_suffix(tail.chars().next()?)?
    } else {
        return None;
    };
    Some(WgslType::Vector { size, scalar })
}

fn parse_matrix(text: &str) -> Option<WgslType> {
    let rest = text.strip_prefix("mat")?;
    let bytes = rest.as_bytes();
    if bytes.len() < 3 || bytes[1] != b'x' {
        return None;
    }
    let columns = (bytes[0] as char).to_digit(10)? as u8;
    let rows = (bytes[2] as char).to_digit(10)? as u8;
    if !(2..=4).contains(&columns) || !(2..=4).contains(&rows) {
        return None;
    }
    match &rest[3..] {
        "" | "f" | "<f32>" => Some(WgslType::Matrix { columns, rows }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_vectors() {
        assert_eq!(WgslType::parse("f32"), WgslType::Scalar(Scalar::F32));
        assert_eq!(
            WgslType::parse("vec3<f32>"),
            WgslType::Vector { size: 3, scalar: Scalar::F32 }
        );
        assert_eq!(
            WgslType::parse("vec2u"),
            WgslType::Vector { size: 2, scalar: Scalar::U32 }
        );
    }

    #[test]
    fn matrices() {
        assert_eq!(WgslType::parse("mat4x4<f32>"), WgslType::Matrix { columns: 4, rows: 4 });
        assert_eq!(WgslType::parse("mat3x3f"), WgslType::Matrix { columns: 3, rows: 3 });
        assert_eq!(WgslType::parse("mat5x5f"), WgslType::Named("mat5x5f".into()));
    }

    #[test]
    fn textures_and_samplers() {
        assert_eq!(WgslType::parse("texture_2d<f32>"), WgslType::Texture2d(Scalar::F32));
        assert_eq!(
            WgslType::parse("texture_storage_2d<rgba8unorm,write>"),
            WgslType::StorageTexture2d { format: "rgba8unorm".into(), access: Access::Write }
        );
        assert_eq!(WgslType::parse("sampler"), WgslType::Sampler);
    }

    #[test]
    fn arrays_and_structs() {
        assert_eq!(WgslType::parse("array<Particle>"), WgslType::Array("Particle".into()));
        assert_eq!(WgslType::parse("Params"), WgslType::Named("Params".into()));
    }
}
