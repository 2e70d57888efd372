//! Shared setup for the GPU integration tests.
//!
//! Every test runs on a headless context. Machines without any adapter
//! (including a software fallback) skip the GPU part and pass.

#![allow(dead_code)]

use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::{Context, ContextOptions, Error, RenderTarget, SurfaceSource, TargetOptions};

pub fn headless_with(width: u32, height: u32, options: ContextOptions) -> Option<Context> {
    init_logging(LoggingConfig::for_tests());
    match Context::init_blocking(SurfaceSource::headless(width, height), options) {
        Ok(ctx) => Some(ctx),
        Err(Error::Unsupported(e)) => {
            log::warn!("no GPU adapter, skipping: {e:#}");
            None
        }
        Err(e) => panic!("headless context failed: {e}"),
    }
}

pub fn headless(width: u32, height: u32) -> Option<Context> {
    headless_with(width, height, ContextOptions::default())
}

/// A target, or `None` when the device cannot provide `options.format` with
/// the usages targets need. Any other failure panics.
pub fn target_or_skip(ctx: &mut Context, width: u32, height: u32, options: TargetOptions) -> Option<RenderTarget> {
    match ctx.target(width, height, options) {
        Ok(target) => Some(target),
        Err(e @ Error::TargetCreation { .. }) => {
            log::warn!("format unsupported here, skipping: {e}");
            None
        }
        Err(e) => panic!("target creation failed: {e}"),
    }
}

/// Whole-target RGBA8 readback.
pub fn read_u8(ctx: &Context, target: RenderTarget) -> Vec<u8> {
    target
        .read_pixels(ctx, None)
        .expect("readback")
        .wait()
        .expect("readback wait")
        .as_u8()
        .expect("8-bit target")
        .to_vec()
}

pub fn read_f32(ctx: &Context, target: RenderTarget) -> Vec<f32> {
    target
        .read_pixels(ctx, None)
        .expect("readback")
        .wait()
        .expect("readback wait")
        .as_f32()
        .expect("float target")
        .to_vec()
}

/// Asserts every channel of an 8-bit pixel is within two steps of `expected`.
pub fn assert_rgba8(actual: &[u8], expected: [f32; 4]) {
    for (c, (&a, e)) in actual.iter().zip(expected).enumerate() {
        let e = (e.clamp(0.0, 1.0) * 255.0).round() as i32;
        assert!(
            (i32::from(a) - e).abs() <= 2,
            "channel {c}: got {a}, expected {e} (pixel {actual:?})"
        );
    }
}

/// A pass writing `u.color` everywhere.
pub const SOLID_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u.color;
}
"#;
