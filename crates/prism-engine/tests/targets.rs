//! Render targets, ping-pong pairs, MRT sets and readback.

mod common;

use prism_engine::resources::Region;
use prism_engine::{
    BindingValue, ComputeOptions, ContextOptions, Error, MaterialOptions, PassOptions, Pixels, SamplerOptions,
    Target, TargetOptions, TextureOptions, TextureSource, Uniforms,
};
use wgpu::TextureFormat;

fn fill(ctx: &mut prism_engine::Context, target: impl Into<Target>, color: [f32; 4]) {
    let pass = ctx
        .pass(common::SOLID_FS, PassOptions::new().with_uniforms(Uniforms::new().set("color", color)))
        .unwrap();
    ctx.set_target(target).unwrap();
    pass.draw(ctx).unwrap();
    pass.dispose(ctx);
}

// ── ping-pong ─────────────────────────────────────────────────────────────

#[test]
fn swap_exchanges_handles_and_is_its_own_inverse() {
    let Some(mut ctx) = common::headless(4, 4) else { return };
    let mut pp = ctx.ping_pong(4, 4, TargetOptions::default()).unwrap();
    let (read, write) = (pp.read(), pp.write());
    assert_ne!(read, write);
    let ids = (read.resource_id(&ctx).unwrap(), write.resource_id(&ctx).unwrap());

    pp.swap();
    assert_eq!((pp.read(), pp.write()), (write, read));
    assert_eq!(pp.read().resource_id(&ctx).unwrap(), ids.1);

    pp.swap();
    assert_eq!((pp.read(), pp.write()), (read, write));
}

#[test]
fn set_target_on_ping_pong_writes_the_write_side() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let mut pp = ctx.ping_pong(2, 2, TargetOptions::default()).unwrap();
    fill(&mut ctx, &pp, [0.0, 1.0, 0.0, 1.0]);
    common::assert_rgba8(&common::read_u8(&ctx, pp.write())[..4], [0.0, 1.0, 0.0, 1.0]);
    common::assert_rgba8(&common::read_u8(&ctx, pp.read())[..4], [0.0, 0.0, 0.0, 0.0]);

    pp.swap();
    common::assert_rgba8(&common::read_u8(&ctx, pp.read())[..4], [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn rejected_resize_leaves_both_sides_untouched() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let pp = ctx.ping_pong(8, 8, TargetOptions::default()).unwrap();
    let before = (pp.read().resource_id(&ctx).unwrap(), pp.write().resource_id(&ctx).unwrap());

    assert!(matches!(pp.resize(&mut ctx, 0, 8), Err(Error::TargetCreation { .. })));
    assert_eq!(pp.size(&ctx).unwrap(), (8, 8));
    assert_eq!(pp.read().resource_id(&ctx).unwrap(), before.0);

    pp.resize(&mut ctx, 16, 4).unwrap();
    assert_eq!(pp.read().size(&ctx).unwrap(), (16, 4));
    assert_eq!(pp.write().size(&ctx).unwrap(), (16, 4));
    assert_ne!(pp.write().resource_id(&ctx).unwrap(), before.1);
}

// ── multi-target sets ─────────────────────────────────────────────────────

#[test]
fn mrt_keeps_construction_order_and_writes_each_target() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let set = ctx
        .mrt(&[("albedo", TextureFormat::Rgba8Unorm), ("data", TextureFormat::Rgba16Float)], 2, 2)
        .unwrap();
    assert_eq!(set.formats(), vec![TextureFormat::Rgba8Unorm, TextureFormat::Rgba16Float]);
    assert_eq!(set.first_target(), set.get("albedo").unwrap());
    assert_eq!(set.attachments(), vec![set.get("albedo").unwrap(), set.get("data").unwrap()]);
    assert!(set.get("normal").is_none());

    let src = r#"
struct Out {
    @location(0) albedo: vec4<f32>,
    @location(1) data: vec4<f32>,
}

@fragment
fn fs_main() -> Out {
    var out: Out;
    out.albedo = vec4<f32>(1.0, 0.0, 0.0, 1.0);
    out.data = vec4<f32>(0.0, 0.0, 2.5, 1.0);
    return out;
}
"#;
    let pass = ctx.pass(src, PassOptions::new()).unwrap();
    ctx.set_target(&set).unwrap();
    pass.draw(&mut ctx).unwrap();

    common::assert_rgba8(&common::read_u8(&ctx, set.get("albedo").unwrap())[..4], [1.0, 0.0, 0.0, 1.0]);
    let data = common::read_f32(&ctx, set.get("data").unwrap());
    assert_eq!(data.len(), 2 * 2 * 4);
    assert_eq!(&data[..4], &[0.0, 0.0, 2.5, 1.0]);
}

#[test]
fn mrt_rejects_duplicate_names_and_empty_sets() {
    let Some(mut ctx) = common::headless(2, 2) else { return };
    let dup = ctx.mrt(&[("a", TextureFormat::Rgba8Unorm), ("a", TextureFormat::Rgba8Unorm)], 2, 2);
    assert!(matches!(dup, Err(Error::TargetCreation { .. })));
    assert!(matches!(ctx.mrt(&[], 2, 2), Err(Error::TargetCreation { .. })));
    assert_eq!(ctx.resource_counts().targets, 1);
}

// ── creation ──────────────────────────────────────────────────────────────

#[test]
fn unsupported_usage_fails_at_creation() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let before = ctx.resource_counts();

    let needed = wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC
        | wgpu::TextureUsages::COPY_DST;
    let renderable = ctx.gpu().format_usages(TextureFormat::R32Float).contains(needed);
    match ctx.target(2, 2, TargetOptions::format(TextureFormat::R32Float)) {
        Ok(target) => {
            assert!(renderable);
            target.dispose(&mut ctx);
        }
        Err(e) => {
            assert!(!renderable);
            assert!(matches!(e, Error::TargetCreation { .. }), "{e}");
        }
    }

    // sRGB formats are never storage-capable.
    let storage = ctx.target(2, 2, TargetOptions::format(TextureFormat::Rgba8UnormSrgb).with_storage());
    assert!(matches!(storage, Err(Error::TargetCreation { .. })));

    assert_eq!(ctx.resource_counts(), before);
    assert!(ctx.take_diagnostics().is_empty());
}

// ── readback ──────────────────────────────────────────────────────────────

#[test]
fn r32float_readback_is_exact() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let Some(target) = common::target_or_skip(&mut ctx, 3, 2, TargetOptions::format(TextureFormat::R32Float)) else {
        return;
    };
    let src = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(u.value, 0.0, 0.0, 1.0);
}
"#;
    let pass = ctx.pass(src, PassOptions::new().with_uniforms(Uniforms::new().set("value", 123.456))).unwrap();
    ctx.set_target(target).unwrap();
    pass.draw(&mut ctx).unwrap();

    let pixels = target.read_pixels(&ctx, None).unwrap().wait().unwrap();
    let Pixels::F32(values) = pixels else { panic!("expected floats, got {pixels:?}") };
    assert_eq!(values.len(), 3 * 2);
    assert!(values.iter().all(|&v| v == 123.456_f32), "{values:?}");
}

#[test]
fn rgba8_readback_is_bytes_with_no_reordering() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    // 3 * 4 = 12 bytes per row, padded to 256 on the GPU side.
    let target = ctx.target(3, 3, TargetOptions::default()).unwrap();
    fill(&mut ctx, target, [1.0, 0.0, 0.0, 1.0]);

    let pixels = common::read_u8(&ctx, target);
    assert_eq!(pixels.len(), 3 * 3 * 4);
    for px in pixels.chunks(4) {
        assert_eq!(px, &[255, 0, 0, 255]);
    }
}

#[test]
fn region_readback_and_concurrent_requests() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let a = ctx.target(4, 4, TargetOptions::default()).unwrap();
    let b = ctx.target(4, 4, TargetOptions::format(TextureFormat::Rgba16Float)).unwrap();
    fill(&mut ctx, a, [0.0, 0.0, 1.0, 1.0]);
    fill(&mut ctx, b, [0.5, 0.25, 0.0, 1.0]);

    let first = a.read_pixels(&ctx, Some(Region::new(1, 1, 2, 3))).unwrap();
    let second = b.read_pixels(&ctx, None).unwrap();
    let second = pollster::block_on(second).unwrap();
    let first = first.wait().unwrap();

    assert_eq!(first.as_u8().unwrap().len(), 2 * 3 * 4);
    assert_eq!(&second.as_f32().unwrap()[..4], &[0.5, 0.25, 0.0, 1.0]);

    let outside = a.read_pixels(&ctx, Some(Region::new(3, 3, 2, 2)));
    assert!(matches!(outside, Err(Error::Readback(_))));
    let wrapping = a.read_pixels(&ctx, Some(Region::new(u32::MAX, 0, 2, 1)));
    assert!(matches!(wrapping, Err(Error::Readback(_))));
}

#[test]
fn headless_screen_follows_options_and_resize() {
    let options = ContextOptions::default().with_headless_format(TextureFormat::Rgba16Float);
    let Some(mut ctx) = common::headless_with(8, 4, options) else { return };
    let screen = ctx.screen().unwrap();
    assert_eq!(screen.format(&ctx).unwrap(), TextureFormat::Rgba16Float);
    assert_eq!(ctx.size(), (8, 4));

    ctx.resize(2, 2).unwrap();
    assert_eq!(ctx.size(), (2, 2));
    assert_eq!(screen.size(&ctx).unwrap(), (2, 2));

    // The screen target belongs to the context.
    screen.dispose(&mut ctx);
    assert!(!screen.is_disposed(&ctx));
}

#[test]
fn storage_buffers_round_trip_through_compute() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let data = ctx.storage(8 * 4).unwrap();
    let src = r#"
@group(1) @binding(1) var<storage, read_write> data: array<u32>;

@compute @workgroup_size(4)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = id.x * 2u + u.offset;
}
"#;
    let compute = ctx
        .compute(
            src,
            prism_engine::ComputeOptions::new()
                .with_uniforms(Uniforms::new().set("offset", 1u32).bind("data", data)),
        )
        .unwrap();
    assert_eq!(compute.workgroup_size(&ctx).unwrap(), Some([4, 1, 1]));
    compute.dispatch_for(&mut ctx, 8, 1).unwrap();

    let bytes = data.read(&ctx).unwrap().wait().unwrap();
    let values: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(values, [1, 3, 5, 7, 9, 11, 13, 15]);
}

#[test]
fn storage_writes_past_the_end_are_rejected() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let data = ctx.storage(16).unwrap();
    assert!(matches!(data.write(&ctx, 16, &[0; 4]), Err(Error::Binding { .. })));
    assert!(matches!(data.write(&ctx, u64::MAX - 1, &[0; 4]), Err(Error::Binding { .. })));
    data.write(&ctx, 12, &[0; 4]).unwrap();
}

// ── compute images and instancing ─────────────────────────────────────────

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn compute_samples_a_read_only_texture() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let texels = [255, 0, 0, 255, 0, 0, 255, 255];
    let image = ctx
        .texture(
            TextureSource::Rgba8 { width: 2, height: 1, data: &texels },
            TextureOptions { sampler: SamplerOptions::NEAREST, ..Default::default() },
        )
        .unwrap();
    let out = ctx.storage(2 * 16).unwrap();
    let src = r#"
@group(1) @binding(4) var<storage, read_write> out: array<vec4<f32>>;

@compute @workgroup_size(2)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let uv = vec2<f32>((f32(id.x) + 0.5) / 2.0, 0.5);
    out[id.x] = textureSampleLevel(image, image_sampler, uv, 0.0);
}
"#;
    let compute = ctx
        .compute(src, ComputeOptions::new().with_uniforms(Uniforms::new().bind("image", image).bind("out", out)))
        .unwrap();
    compute.dispatch(&mut ctx, 1, 1, 1).unwrap();
    assert!(ctx.take_diagnostics().is_empty());

    let values = floats(&out.read(&ctx).unwrap().wait().unwrap());
    assert_eq!(values, [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn compute_writes_a_storage_target() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let Some(target) = common::target_or_skip(&mut ctx, 4, 2, TargetOptions::default().with_storage()) else {
        return;
    };
    let src = r#"
@group(1) @binding(0) var canvas: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let top = f32(id.y == 0u);
    textureStore(canvas, vec2<i32>(id.xy), vec4<f32>(top, 0.0, 1.0 - top, 1.0));
}
"#;
    let compute = ctx
        .compute(
            src,
            ComputeOptions::new().with_uniforms(Uniforms::new().bind("canvas", BindingValue::StorageTexture(target))),
        )
        .unwrap();
    compute.dispatch(&mut ctx, 4, 2, 1).unwrap();

    let pixels = common::read_u8(&ctx, target);
    assert_eq!(pixels.len(), 4 * 2 * 4);
    let (top, bottom) = pixels.split_at(4 * 4);
    assert!(top.chunks(4).all(|px| px == [255, 0, 0, 255]), "{top:?}");
    assert!(bottom.chunks(4).all(|px| px == [0, 0, 255, 255]), "{bottom:?}");
}

#[test]
fn material_reads_per_instance_storage() {
    let Some(mut ctx) = common::headless(1, 1) else { return };
    let target = ctx.target(2, 1, TargetOptions::default()).unwrap();
    let colors = ctx.storage(2 * 16).unwrap();
    colors.write_pod(&ctx, 0, &[0.0f32, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0]).unwrap();

    let vs = r#"
@group(1) @binding(0) var<storage, read> colors: array<vec4<f32>>;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) @interpolate(flat) color: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) v: u32, @builtin(instance_index) i: u32) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let c = corners[v];
    var out: VsOut;
    out.position = vec4<f32>(f32(i) + c.x - 1.0, c.y * 2.0 - 1.0, 0.0, 1.0);
    out.color = colors[i];
    return out;
}
"#;
    let fs = r#"
@fragment
fn fs_main(@location(0) @interpolate(flat) color: vec4<f32>) -> @location(0) vec4<f32> {
    return color;
}
"#;
    let material = ctx
        .material(
            vs,
            fs,
            MaterialOptions::new()
                .with_vertex_count(6)
                .with_instances(2)
                .with_uniforms(Uniforms::new().bind("colors", colors)),
        )
        .unwrap();
    ctx.set_target(target).unwrap();
    material.draw(&mut ctx).unwrap();
    assert!(ctx.take_diagnostics().is_empty());

    let pixels = common::read_u8(&ctx, target);
    assert_eq!(&pixels[..4], &[0, 255, 0, 255]);
    assert_eq!(&pixels[4..], &[255, 255, 0, 255]);
}
