//! Binding plans, diagnostics and per-call failure isolation on a real device.

mod common;

use prism_engine::binding::GlobalField;
use prism_engine::{
    BindingValue, Error, EventTypes, PassOptions, TargetOptions, UniformValue, Uniforms,
};

const PLAIN_FS: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

const TIMED_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(fract(globals.time), 0.0, 0.0, 1.0);
}
"#;

#[test]
fn globals_free_shader_binds_nothing() {
    let Some(mut ctx) = common::headless(4, 4) else { return };
    let pass = ctx.pass(PLAIN_FS, PassOptions::new()).unwrap();

    let plan = pass.plan(&ctx).unwrap();
    assert!(plan.globals().is_empty());
    assert!(!plan.uses_globals());
    assert!(!plan.uses_locals());

    let screen = ctx.screen().unwrap();
    pass.draw(&mut ctx).unwrap();
    let pixels = common::read_u8(&ctx, screen);
    assert_eq!(pixels.len(), 4 * 4 * 4);
    // Top-left texel centre is uv (0.125, 0.125).
    common::assert_rgba8(&pixels[..4], [0.125, 0.125, 0.0, 1.0]);
}

#[test]
fn referenced_globals_are_the_only_ones_planned() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let pass = ctx.pass(TIMED_FS, PassOptions::new()).unwrap();
    assert_eq!(pass.plan(&ctx).unwrap().globals(), &[GlobalField::Time]);
    pass.draw(&mut ctx).unwrap();
    assert!(ctx.take_diagnostics().is_empty());
}

#[test]
fn simple_uniforms_reach_the_shader_and_can_be_replaced() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let pass = ctx
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", [1.0, 0.0, 0.0, 1.0])))
        .unwrap();
    let screen = ctx.screen().unwrap();

    pass.draw(&mut ctx).unwrap();
    common::assert_rgba8(&common::read_u8(&ctx, screen), [1.0, 0.0, 0.0, 1.0]);

    pass.set_uniform(&mut ctx, "color", [0.0, 0.0, 1.0, 1.0]).unwrap();
    pass.draw(&mut ctx).unwrap();
    common::assert_rgba8(&common::read_u8(&ctx, screen), [0.0, 0.0, 1.0, 1.0]);

    assert_eq!(
        pass.uniform(&ctx, "color").unwrap(),
        Some(BindingValue::Uniform(UniformValue::Vec4([0.0, 0.0, 1.0, 1.0])))
    );
}

#[test]
fn unknown_uniform_is_rejected() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let pass = ctx
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", [1.0; 4])))
        .unwrap();
    let err = pass.set_uniform(&mut ctx, "colour", 1.0).unwrap_err();
    assert!(matches!(err, Error::UnknownUniform { ref name, .. } if name == "colour"), "{err}");
}

#[test]
fn wrong_resource_kind_fails_creation() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let storage = ctx.storage(16).unwrap();
    let src = r#"
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var tex_sampler: sampler;
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(tex, tex_sampler, uv);
}
"#;
    let err = ctx
        .pass(src, PassOptions::new().with_uniforms(Uniforms::new().bind("tex", storage)))
        .unwrap_err();
    assert!(matches!(err, Error::Binding { .. }), "{err}");
}

#[test]
fn invalid_shader_is_skipped_not_fatal() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let broken = "@fragment\nfn fs_main() -> @location(0) vec4<f32> {\n    return vec4<f32>(nope, 0.0, 0.0, 1.0);\n}\n";
    let pass = ctx.pass(broken, PassOptions::new().with_label("broken")).unwrap();
    assert!(pass.is_broken(&ctx).unwrap());

    let diagnostics = ctx.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].program.as_deref(), Some("broken"));
    assert_eq!(diagnostics[0].line, Some(3));

    pass.draw(&mut ctx).unwrap();
    pass.draw(&mut ctx).unwrap();
    let draws: Vec<_> = ctx.history(Some(EventTypes::DRAW)).collect();
    assert_eq!(draws.len(), 2);
    assert!(draws.iter().all(|e| e.payload.skipped()));
}

#[test]
fn device_errors_carry_their_cause() {
    let Some(ctx) = common::headless(1, 1) else { return };
    // Mapping a buffer both ways needs a feature the context never requests.
    let _ = ctx.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("read and write mapped"),
        size: 16,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::MAP_WRITE,
        mapped_at_creation: false,
    });

    let diagnostics = ctx.take_diagnostics();
    let device = diagnostics.iter().find(|d| d.program.is_none()).expect("device diagnostic");
    assert!(device.message.len() > "Validation Error".len(), "{}", device.message);
}

#[test]
fn bind_groups_are_reused_until_a_resource_changes() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let a = ctx.target(2, 2, TargetOptions::default()).unwrap();
    let b = ctx.target(2, 2, TargetOptions::default()).unwrap();
    let src = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, uv);
}
"#;
    let pass = ctx.pass(src, PassOptions::new().with_uniforms(Uniforms::new().bind("image", a))).unwrap();

    pass.draw(&mut ctx).unwrap();
    pass.draw(&mut ctx).unwrap();
    let stats = pass.bind_group_cache_stats(&ctx).unwrap();
    assert_eq!((stats.misses, stats.hits), (1, 1));

    pass.set_uniform(&mut ctx, "image", b).unwrap();
    pass.draw(&mut ctx).unwrap();
    assert_eq!(pass.bind_group_cache_stats(&ctx).unwrap().misses, 2);

    // Resizing reallocates the texture, so the cached group is stale.
    b.resize(&mut ctx, 4, 4).unwrap();
    pass.draw(&mut ctx).unwrap();
    assert_eq!(pass.bind_group_cache_stats(&ctx).unwrap().misses, 3);
}

#[test]
fn disposed_binding_fails_only_that_draw() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let image = ctx.target(2, 2, TargetOptions::default()).unwrap();
    let src = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, uv);
}
"#;
    let pass = ctx.pass(src, PassOptions::new().with_uniforms(Uniforms::new().bind("image", image))).unwrap();
    image.dispose(&mut ctx);

    let err = pass.draw(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::Binding { .. }), "{err}");
    assert_eq!(ctx.history(Some(EventTypes::DRAW)).count(), 0);

    let fresh = ctx.target(2, 2, TargetOptions::default()).unwrap();
    pass.set_uniform(&mut ctx, "image", fresh).unwrap();
    pass.draw(&mut ctx).unwrap();
}
