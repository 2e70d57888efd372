use crate::error::{Error, Result};
use crate::resources::{MultiTargetSet, PingPongTarget, RenderTarget, Sampler, StorageBuffer, Texture};

/// A plain-data uniform value.
///
/// Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Uint(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// Component count as seen by the caller (9 for `Mat3`, not 12).
    pub fn len(&self) -> usize {
        match self {
            Self::Float(_) | Self::Int(_) | Self::Uint(_) => 1,
            Self::Vec2(_) => 2,
            Self::Vec3(_) => 3,
            Self::Vec4(_) => 4,
            Self::Mat3(_) => 9,
            Self::Mat4(_) => 16,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Components widened to `f64` so integer conversions stay exact.
    pub(crate) fn components(&self) -> Vec<f64> {
        match self {
            Self::Float(v) => vec![f64::from(*v)],
            Self::Int(v) => vec![f64::from(*v)],
            Self::Uint(v) => vec![f64::from(*v)],
            Self::Vec2(v) => v.iter().map(|c| f64::from(*c)).collect(),
            Self::Vec3(v) => v.iter().map(|c| f64::from(*c)).collect(),
            Self::Vec4(v) => v.iter().map(|c| f64::from(*c)).collect(),
            Self::Mat3(v) => v.iter().map(|c| f64::from(*c)).collect(),
            Self::Mat4(v) => v.iter().map(|c| f64::from(*c)).collect(),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::Uint(v)
    }
}

macro_rules! from_array {
    ($($n:literal => $variant:ident),*) => {$(
        impl From<[f32; $n]> for UniformValue {
            fn from(v: [f32; $n]) -> Self {
                Self::$variant(v)
            }
        }
    )*};
}

from_array!(2 => Vec2, 3 => Vec3, 4 => Vec4, 9 => Mat3, 16 => Mat4);

impl TryFrom<&[f32]> for UniformValue {
    type Error = Error;

    /// Infers the shape from the length: 1 → f32, 2/3/4 → vecN, 9 → mat3,
    /// 16 → mat4.
    fn try_from(v: &[f32]) -> Result<Self> {
        Ok(match v.len() {
            1 => Self::Float(v[0]),
            2 => Self::Vec2([v[0], v[1]]),
            3 => Self::Vec3([v[0], v[1], v[2]]),
            4 => Self::Vec4([v[0], v[1], v[2], v[3]]),
            9 => {
                let mut m = [0.0; 9];
                m.copy_from_slice(v);
                Self::Mat3(m)
            }
            16 => {
                let mut m = [0.0; 16];
                m.copy_from_slice(v);
                Self::Mat4(m)
            }
            n => {
                return Err(Error::binding(
                    "uniform value",
                    format!("{n} components do not form a scalar, vector or matrix (expected 1, 2, 3, 4, 9 or 16)"),
                ));
            }
        })
    }
}

impl TryFrom<Vec<f32>> for UniformValue {
    type Error = Error;

    fn try_from(v: Vec<f32>) -> Result<Self> {
        Self::try_from(v.as_slice())
    }
}

/// A sampled image: render targets and uploaded textures bind the same way.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureRef {
    Target(RenderTarget),
    Texture(Texture),
}

/// Anything that can occupy a binding slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BindingValue {
    Uniform(UniformValue),
    Texture(TextureRef),
    Sampler(Sampler),
    Storage(StorageBuffer),
    /// A target written through `texture_storage_2d` in compute programs.
    StorageTexture(RenderTarget),
}

impl BindingValue {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Uniform(_) => "uniform value",
            Self::Texture(_) => "texture",
            Self::Sampler(_) => "sampler",
            Self::Storage(_) => "storage buffer",
            Self::StorageTexture(_) => "storage texture",
        }
    }
}

macro_rules! uniform_binding {
    ($($t:ty),*) => {$(
        impl From<$t> for BindingValue {
            fn from(v: $t) -> Self {
                Self::Uniform(v.into())
            }
        }
    )*};
}

uniform_binding!(UniformValue, f32, i32, u32, [f32; 2], [f32; 3], [f32; 4], [f32; 9], [f32; 16]);

impl From<RenderTarget> for BindingValue {
    fn from(t: RenderTarget) -> Self {
        Self::Texture(TextureRef::Target(t))
    }
}

/// Binds the read side.
impl From<&PingPongTarget> for BindingValue {
    fn from(pp: &PingPongTarget) -> Self {
        Self::Texture(TextureRef::Target(pp.read()))
    }
}

/// Binds the first attachment.
impl From<&MultiTargetSet> for BindingValue {
    fn from(mrt: &MultiTargetSet) -> Self {
        Self::Texture(TextureRef::Target(mrt.first_target()))
    }
}

impl From<Texture> for BindingValue {
    fn from(t: Texture) -> Self {
        Self::Texture(TextureRef::Texture(t))
    }
}

impl From<Sampler> for BindingValue {
    fn from(s: Sampler) -> Self {
        Self::Sampler(s)
    }
}

impl From<StorageBuffer> for BindingValue {
    fn from(s: StorageBuffer) -> Self {
        Self::Storage(s)
    }
}

/// How a caller supplied an entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformStyle {
    /// Packed into the shared `u` block.
    Simple,
    /// Own binding slot.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformEntry {
    pub name: String,
    pub style: UniformStyle,
    pub value: BindingValue,
}

/// Insertion-ordered uniform dictionary passed to program factories.
///
/// ```
/// use prism_engine::binding::Uniforms;
///
/// let u = Uniforms::new()
///     .set("speed", 2.0)
///     .set("tint", [1.0, 0.5, 0.0, 1.0]);
/// assert_eq!(u.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    entries: Vec<UniformEntry>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simple style: packed into the `u` block in insertion order.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.insert(name.into(), UniformStyle::Simple, BindingValue::Uniform(value.into()));
        self
    }

    /// Manual style: the value gets its own binding slot.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        self.insert(name.into(), UniformStyle::Manual, value.into());
        self
    }

    /// Re-setting a name keeps its original position.
    pub(crate) fn insert(&mut self, name: String, style: UniformStyle, value: BindingValue) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => {
                e.style = style;
                e.value = value;
            }
            None => self.entries.push(UniformEntry { name, style, value }),
        }
    }

    pub(crate) fn replace_value(&mut self, name: &str, value: BindingValue) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(e) => {
                e.value = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&BindingValue> {
        self.entry(name).map(|e| &e.value)
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&UniformEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &UniformEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_length_picks_shape() {
        assert_eq!(UniformValue::try_from(&[1.0][..]).unwrap(), UniformValue::Float(1.0));
        assert!(matches!(UniformValue::try_from(&[0.0; 3][..]).unwrap(), UniformValue::Vec3(_)));
        assert!(matches!(UniformValue::try_from(vec![0.0; 9]).unwrap(), UniformValue::Mat3(_)));
        assert!(matches!(UniformValue::try_from(&[0.0; 16][..]).unwrap(), UniformValue::Mat4(_)));
    }

    #[test]
    fn odd_lengths_are_descriptive_errors() {
        let err = UniformValue::try_from(&[0.0; 5][..]).unwrap_err();
        assert!(err.to_string().contains("5 components"));
        assert!(UniformValue::try_from(&[][..]).is_err());
    }

    #[test]
    fn reset_keeps_insertion_order() {
        let u = Uniforms::new().set("a", 1.0).set("b", 2.0).set("a", 3.0);
        assert_eq!(u.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(u.get("a"), Some(&BindingValue::Uniform(UniformValue::Float(3.0))));
    }

    #[test]
    fn set_and_bind_record_style() {
        let u = Uniforms::new().set("a", 1.0).bind("b", [1.0, 2.0]);
        assert_eq!(u.entry("a").unwrap().style, UniformStyle::Simple);
        assert_eq!(u.entry("b").unwrap().style, UniformStyle::Manual);
    }
}
