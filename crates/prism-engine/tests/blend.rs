//! Blend presets against the fixed-function pipeline.

mod common;

use prism_engine::{BlendMode, ContextOptions, PassOptions, TargetOptions, Uniforms};

/// Clears a 1x1 RGBA8 target to `dst`, draws `src` with `mode` and reads it back.
fn composite(mode: BlendMode, src: [f32; 4], dst: [f32; 4]) -> Option<Vec<u8>> {
    let mut ctx = common::headless_with(1, 1, ContextOptions::default().with_auto_clear(false))?;
    let target = ctx.target(1, 1, TargetOptions::default()).unwrap();
    let pass = ctx
        .pass(
            common::SOLID_FS,
            PassOptions::new().with_blend(mode).with_uniforms(Uniforms::new().set("color", src)),
        )
        .unwrap();

    let [r, g, b, a] = dst.map(f64::from);
    ctx.clear(target, wgpu::Color { r, g, b, a }).unwrap();
    ctx.set_target(target).unwrap();
    pass.draw(&mut ctx).unwrap();
    Some(common::read_u8(&ctx, target))
}

#[test]
fn no_blend_overwrites() {
    let Some(px) = composite(BlendMode::None, [0.2, 0.4, 0.6, 0.5], [1.0, 1.0, 1.0, 1.0]) else { return };
    common::assert_rgba8(&px, [0.2, 0.4, 0.6, 0.5]);
}

#[test]
fn additive_sums() {
    let Some(px) = composite(BlendMode::Additive, [0.5, 0.25, 0.0, 0.25], [0.25, 0.25, 0.25, 0.5]) else {
        return;
    };
    common::assert_rgba8(&px, [0.75, 0.5, 0.25, 0.75]);
}

#[test]
fn multiply_scales_destination() {
    let Some(px) = composite(BlendMode::Multiply, [0.5, 0.5, 1.0, 1.0], [0.5, 1.0, 0.5, 1.0]) else {
        return;
    };
    common::assert_rgba8(&px, [0.25, 0.5, 0.5, 1.0]);
}

#[test]
fn alpha_is_straight_over() {
    let Some(px) = composite(BlendMode::Alpha, [1.0, 0.0, 0.0, 0.25], [0.0, 0.0, 1.0, 1.0]) else { return };
    common::assert_rgba8(&px, [0.25, 0.0, 0.75, 1.0]);
}

#[test]
fn non_blendable_target_draws_without_blending() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let Some(target) = common::target_or_skip(&mut ctx, 1, 1, TargetOptions::format(wgpu::TextureFormat::Rgba32Float))
    else {
        return;
    };
    let pass = ctx
        .pass(
            common::SOLID_FS,
            PassOptions::new()
                .with_blend(BlendMode::Additive)
                .with_uniforms(Uniforms::new().set("color", [0.5, 0.5, 0.5, 1.0])),
        )
        .unwrap();
    ctx.clear(target, wgpu::Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 }).unwrap();
    ctx.set_target(target).unwrap();
    pass.draw(&mut ctx).unwrap();
    assert_eq!(common::read_f32(&ctx, target), vec![0.5, 0.5, 0.5, 1.0]);
}
