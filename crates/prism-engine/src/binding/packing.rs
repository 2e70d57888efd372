//! Byte layout of uniform data under WGSL uniform address-space rules.

use prism_wgsl::Scalar;

use super::kind::UniformKind;
use super::value::UniformValue;

/// Uniform buffers are sized in multiples of this.
pub(crate) const BLOCK_ALIGN: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockField {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

/// Assigns offsets in order and returns the block size (rounded to 16, at
/// least 16). Non-data kinds are skipped by the caller.
pub(crate) fn layout_block(fields: impl IntoIterator<Item = (String, UniformKind)>) -> (Vec<BlockField>, u32) {
    let mut offset = 0u32;
    let mut out = Vec::new();
    for (name, kind) in fields {
        let Some((align, size)) = kind.uniform_layout() else { continue };
        offset = offset.next_multiple_of(align);
        out.push(BlockField { name, kind, offset });
        offset += size;
    }
    (out, offset.next_multiple_of(BLOCK_ALIGN).max(BLOCK_ALIGN))
}

/// Buffer size for a standalone uniform binding of `kind`.
pub(crate) fn slot_size(kind: &UniformKind) -> u64 {
    kind.uniform_layout()
        .map(|(_, size)| u64::from(size.next_multiple_of(BLOCK_ALIGN)))
        .unwrap_or(u64::from(BLOCK_ALIGN))
}

fn write_scalar(scalar: Scalar, c: f64, out: &mut [u8]) {
    match scalar {
        Scalar::F32 => out[..4].copy_from_slice(&(c as f32).to_le_bytes()),
        Scalar::I32 => out[..4].copy_from_slice(&(c as i32).to_le_bytes()),
        Scalar::U32 | Scalar::Bool => out[..4].copy_from_slice(&(c as u32).to_le_bytes()),
        Scalar::F16 => out[..2].copy_from_slice(&half::f16::from_f64(c).to_le_bytes()),
    }
}

fn scalar_stride(scalar: Scalar) -> usize {
    if scalar == Scalar::F16 { 2 } else { 4 }
}

/// Writes `value` at the start of `out`, converting numbers to the declared
/// scalar type. `out` must hold at least the kind's size.
pub(crate) fn pack_value(kind: &UniformKind, value: &UniformValue, out: &mut [u8]) -> Result<(), String> {
    let comps = value.components();
    let mismatch = || format!("{} components do not fit {}", comps.len(), kind.wgsl_type());
    match kind {
        UniformKind::Scalar(s) => {
            let [c] = comps.as_slice() else { return Err(mismatch()) };
            write_scalar(*s, *c, out);
        }
        UniformKind::Vector { size, scalar } => {
            if comps.len() != *size as usize {
                return Err(mismatch());
            }
            let stride = scalar_stride(*scalar);
            for (i, c) in comps.iter().enumerate() {
                write_scalar(*scalar, *c, &mut out[i * stride..]);
            }
        }
        UniformKind::Mat3 => {
            if !matches!(value, UniformValue::Mat3(_)) {
                return Err(mismatch());
            }
            // Each column occupies a vec4.
            for (i, c) in comps.iter().enumerate() {
                let (col, row) = (i / 3, i % 3);
                write_scalar(Scalar::F32, *c, &mut out[(col * 4 + row) * 4..]);
            }
        }
        UniformKind::Mat4 => {
            if !matches!(value, UniformValue::Mat4(_)) {
                return Err(mismatch());
            }
            for (i, c) in comps.iter().enumerate() {
                write_scalar(Scalar::F32, *c, &mut out[i * 4..]);
            }
        }
        other => return Err(format!("{} is not plain uniform data", other.wgsl_type())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32s(bytes: &[u8]) -> Vec<f32> {
        bytes.chunks_exact(4).map(|c| f32::from_le_bytes(c.try_into().unwrap())).collect()
    }

    // ── layout ──

    #[test]
    fn vec3_is_aligned_to_16() {
        let (fields, size) = layout_block([
            ("t".to_string(), UniformKind::Scalar(Scalar::F32)),
            ("c".to_string(), UniformKind::Vector { size: 3, scalar: Scalar::F32 }),
            ("s".to_string(), UniformKind::Scalar(Scalar::F32)),
        ]);
        let offsets: Vec<_> = fields.iter().map(|f| f.offset).collect();
        // The scalar after a vec3 packs into its trailing 4 bytes.
        assert_eq!(offsets, [0, 16, 28]);
        assert_eq!(size, 32);
    }

    #[test]
    fn block_size_rounds_up_and_has_a_floor() {
        let (_, size) = layout_block([("a".to_string(), UniformKind::Scalar(Scalar::F32))]);
        assert_eq!(size, 16);
        let (_, size) = layout_block(Vec::<(String, UniformKind)>::new());
        assert_eq!(size, 16);
        let (fields, size) = layout_block([
            ("a".to_string(), UniformKind::Vector { size: 2, scalar: Scalar::F32 }),
            ("m".to_string(), UniformKind::Mat3),
        ]);
        assert_eq!(fields[1].offset, 16);
        assert_eq!(size, 64);
    }

    // ── packing ──

    #[test]
    fn mat3_columns_are_padded() {
        let mut out = [0u8; 48];
        let m = UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        pack_value(&UniformKind::Mat3, &m, &mut out).unwrap();
        assert_eq!(
            f32s(&out),
            [1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
        );
    }

    #[test]
    fn declared_integers_convert_numbers() {
        let mut out = [0u8; 8];
        pack_value(
            &UniformKind::Vector { size: 2, scalar: Scalar::I32 },
            &UniformValue::Vec2([3.0, -2.0]),
            &mut out,
        )
        .unwrap();
        assert_eq!(i32::from_le_bytes(out[..4].try_into().unwrap()), 3);
        assert_eq!(i32::from_le_bytes(out[4..].try_into().unwrap()), -2);

        let mut out = [0u8; 4];
        pack_value(&UniformKind::Scalar(Scalar::U32), &UniformValue::Float(7.0), &mut out).unwrap();
        assert_eq!(u32::from_le_bytes(out), 7);
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let mut out = [0u8; 16];
        let err = pack_value(
            &UniformKind::Vector { size: 4, scalar: Scalar::F32 },
            &UniformValue::Vec3([0.0; 3]),
            &mut out,
        )
        .unwrap_err();
        assert!(err.contains("3 components"));
        assert!(pack_value(&UniformKind::Mat4, &UniformValue::Float(1.0), &mut out).is_err());
    }
}
