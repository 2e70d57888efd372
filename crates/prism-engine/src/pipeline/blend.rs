/// Color-target blending for passes and materials.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    None,
    /// Straight-alpha "over".
    Alpha,
    Additive,
    Multiply,
    Screen,
    Custom(wgpu::BlendState),
}

const fn component(
    src_factor: wgpu::BlendFactor,
    dst_factor: wgpu::BlendFactor,
) -> wgpu::BlendComponent {
    wgpu::BlendComponent { src_factor, dst_factor, operation: wgpu::BlendOperation::Add }
}

impl BlendMode {
    pub fn state(self) -> Option<wgpu::BlendState> {
        use wgpu::BlendFactor as F;
        Some(match self {
            Self::None => return None,
            Self::Alpha => wgpu::BlendState {
                color: component(F::SrcAlpha, F::OneMinusSrcAlpha),
                alpha: component(F::One, F::OneMinusSrcAlpha),
            },
            Self::Additive => wgpu::BlendState {
                color: component(F::One, F::One),
                alpha: component(F::One, F::One),
            },
            Self::Multiply => wgpu::BlendState {
                color: component(F::Dst, F::Zero),
                alpha: component(F::DstAlpha, F::Zero),
            },
            Self::Screen => wgpu::BlendState {
                color: component(F::One, F::OneMinusSrc),
                alpha: component(F::One, F::OneMinusSrcAlpha),
            },
            Self::Custom(state) => state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(f: wgpu::BlendFactor, src: [f32; 4], dst: [f32; 4], c: usize) -> f32 {
        use wgpu::BlendFactor as F;
        match f {
            F::Zero => 0.0,
            F::One => 1.0,
            F::Src => src[c],
            F::OneMinusSrc => 1.0 - src[c],
            F::Dst => dst[c],
            F::SrcAlpha => src[3],
            F::OneMinusSrcAlpha => 1.0 - src[3],
            F::DstAlpha => dst[3],
            other => panic!("factor {other:?} not modelled"),
        }
    }

    // CPU model of the fixed-function blend with `Add` operations.
    fn blend(mode: BlendMode, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let Some(state) = mode.state() else { return src };
        std::array::from_fn(|c| {
            let comp = if c == 3 { state.alpha } else { state.color };
            src[c] * factor(comp.src_factor, src, dst, c) + dst[c] * factor(comp.dst_factor, src, dst, c)
        })
    }

    fn close(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn none_overwrites() {
        assert_eq!(BlendMode::None.state(), None);
        assert_eq!(blend(BlendMode::None, [0.1, 0.2, 0.3, 0.4], [1.0; 4]), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn additive_sums() {
        let out = blend(BlendMode::Additive, [0.25, 0.5, 0.0, 0.5], [0.25, 0.25, 0.5, 0.5]);
        assert!(close(out, [0.5, 0.75, 0.5, 1.0]));
    }

    #[test]
    fn multiply_scales_by_destination() {
        let out = blend(BlendMode::Multiply, [0.5, 0.5, 1.0, 1.0], [0.5, 1.0, 0.25, 1.0]);
        assert!(close(out, [0.25, 0.5, 0.25, 1.0]));
    }

    #[test]
    fn alpha_is_over_operator() {
        let out = blend(BlendMode::Alpha, [1.0, 0.0, 0.0, 0.5], [0.0, 0.0, 1.0, 1.0]);
        assert!(close(out, [0.5, 0.0, 0.5, 1.0]));
    }

    #[test]
    fn screen_never_darkens() {
        let out = blend(BlendMode::Screen, [0.5, 0.0, 1.0, 1.0], [0.5, 0.5, 0.5, 1.0]);
        assert!(close(out, [0.75, 0.5, 1.0, 1.0]));
    }

    #[test]
    fn custom_passes_through() {
        let state = wgpu::BlendState::REPLACE;
        assert_eq!(BlendMode::Custom(state).state(), Some(state));
    }
}
