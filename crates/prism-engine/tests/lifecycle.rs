//! Context lifetime, isolation between contexts, time and degenerate draws.

mod common;

use prism_engine::resources::ResourceCounts;
use prism_engine::{
    Context, ContextOptions, Error, EventTypes, MaterialOptions, PassOptions, SamplerOptions, SurfaceSource, TargetOptions,
    Uniforms,
};

const FULLSCREEN_VS: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    var corners = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    return vec4<f32>(corners[i], 0.0, 1.0);
}
"#;

const CLOCK_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(globals.time, globals.deltaTime, 0.0, 1.0);
}
"#;

// ── lifetime ──────────────────────────────────────────────────────────────

#[test]
fn dispose_then_reinit() {
    let Some(mut ctx) = common::headless(4, 4) else { return };
    let target = ctx.target(4, 4, TargetOptions::default()).unwrap();
    let sampler = ctx.create_sampler(SamplerOptions::NEAREST);
    let pass = ctx
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", [1.0; 4])))
        .unwrap();
    ctx.set_target(target).unwrap();
    pass.draw(&mut ctx).unwrap();

    // Children may go first; disposing twice is harmless.
    pass.dispose(&mut ctx);
    pass.dispose(&mut ctx);
    sampler.dispose(&mut ctx);
    target.dispose(&mut ctx);
    target.dispose(&mut ctx);
    assert!(matches!(pass.draw(&mut ctx), Err(Error::Disposed("pass"))));
    assert!(target.is_disposed(&ctx));
    assert_eq!(ctx.program_count(), 0);
    ctx.dispose();

    let Some(mut ctx) = common::headless(4, 4) else { return };
    let pass = ctx
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", [0.0, 1.0, 0.0, 1.0])))
        .unwrap();
    pass.draw(&mut ctx).unwrap();
    let screen = ctx.screen().unwrap();
    common::assert_rgba8(&common::read_u8(&ctx, screen)[..4], [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn default_labels_are_not_reused_after_dispose() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let options = || PassOptions::new().with_uniforms(Uniforms::new().set("color", [1.0; 4]));
    let first = ctx.pass(common::SOLID_FS, options()).unwrap();
    let first_label = first.label(&ctx).unwrap().to_string();
    first.dispose(&mut ctx);

    let second = ctx.pass(common::SOLID_FS, options()).unwrap();
    assert_ne!(second.label(&ctx).unwrap(), first_label);
    assert!(first_label.starts_with("pass#"));
}

#[test]
fn drop_releases_everything_left() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    ctx.target(2, 2, TargetOptions::default()).unwrap();
    ctx.storage(64).unwrap();
    let _ = ctx.create_sampler(SamplerOptions::LINEAR);
    assert_eq!(
        ctx.resource_counts(),
        ResourceCounts { targets: 2, textures: 0, storage_buffers: 1, samplers: 1 }
    );
    drop(ctx);
}

#[test]
fn contexts_are_isolated() {
    let Some(mut a) = common::headless(2, 2) else { return };
    let Some(mut b) = common::headless(2, 2) else { return };
    assert_ne!(a.id(), b.id());

    let target = a.target(2, 2, TargetOptions::default()).unwrap();
    let pass = a
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", [1.0; 4])))
        .unwrap();

    assert!(matches!(b.set_target(target), Err(Error::ForeignHandle(_))));
    assert!(matches!(pass.draw(&mut b), Err(Error::ForeignHandle("pass"))));
    assert!(matches!(target.size(&b), Err(Error::ForeignHandle(_))));

    let src = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, uv);
}
"#;
    let err = b
        .pass(src, PassOptions::new().with_uniforms(Uniforms::new().bind("image", target)))
        .unwrap_err();
    assert!(matches!(err, Error::Binding { .. }), "{err}");

    // Disposing through the wrong context does nothing.
    target.dispose(&mut b);
    assert!(!target.is_disposed(&a));
    pass.draw(&mut a).unwrap();
}

// ── time ──────────────────────────────────────────────────────────────────

#[test]
fn reversed_dt_clamps_fail_init() {
    let options = ContextOptions::default()
        .with_dt_clamps(std::time::Duration::from_millis(300), std::time::Duration::from_millis(1));
    let result = Context::init_blocking(SurfaceSource::headless(1, 1), options);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn paused_time_is_bit_identical_across_draws() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let Some(target) = common::target_or_skip(&mut ctx, 1, 1, TargetOptions::format(wgpu::TextureFormat::Rgba32Float))
    else {
        return;
    };
    let pass = ctx.pass(CLOCK_FS, PassOptions::new()).unwrap();
    ctx.set_target(target).unwrap();

    ctx.update_time();
    ctx.set_time(1.25);
    ctx.set_paused(true);
    pass.draw(&mut ctx).unwrap();
    let first = common::read_f32(&ctx, target);
    let frame = ctx.frame();

    std::thread::sleep(std::time::Duration::from_millis(5));
    ctx.update_time();
    pass.draw(&mut ctx).unwrap();
    let second = common::read_f32(&ctx, target);

    assert_eq!(first[0], 1.25);
    assert_eq!(first[0].to_bits(), second[0].to_bits());
    assert_eq!(first[1].to_bits(), second[1].to_bits());
    assert_eq!(ctx.frame(), frame + 1);

    ctx.set_paused(false);
    std::thread::sleep(std::time::Duration::from_millis(5));
    ctx.update_time();
    assert!(ctx.time() > 1.25);
}

// ── degenerate draws ──────────────────────────────────────────────────────

#[test]
fn zero_vertices_or_instances_draw_nothing() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let material = ctx
        .material(
            FULLSCREEN_VS,
            common::SOLID_FS,
            MaterialOptions::new()
                .with_vertex_count(0)
                .with_uniforms(Uniforms::new().set("color", [1.0, 1.0, 1.0, 1.0])),
        )
        .unwrap();
    let screen = ctx.screen().unwrap();
    ctx.set_target(screen).unwrap();

    material.draw(&mut ctx).unwrap();
    material.set_vertex_count(&mut ctx, 3).unwrap();
    material.set_instances(&mut ctx, 0).unwrap();
    material.draw(&mut ctx).unwrap();
    common::assert_rgba8(&common::read_u8(&ctx, screen)[..4], [0.0, 0.0, 0.0, 0.0]);
    assert_eq!(ctx.history(Some(EventTypes::DRAW)).count(), 2);

    material.set_instances(&mut ctx, 1).unwrap();
    material.draw(&mut ctx).unwrap();
    common::assert_rgba8(&common::read_u8(&ctx, screen)[..4], [1.0, 1.0, 1.0, 1.0]);
    assert_eq!(material.vertex_count(&ctx).unwrap(), 3);
}

#[test]
fn self_feedback_does_not_crash() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let target = ctx.target(2, 2, TargetOptions::default()).unwrap();
    let src = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, uv);
}
"#;
    let pass = ctx.pass(src, PassOptions::new().with_uniforms(Uniforms::new().bind("image", target))).unwrap();
    ctx.set_target(target).unwrap();
    // wgpu rejects the read/write hazard; it surfaces as a device diagnostic.
    let _ = pass.draw(&mut ctx);
    let _ = ctx.take_diagnostics();
}
