//! Ping-pong feedback demo: a glowing point orbits the screen and leaves a
//! decaying trail. Space pauses time, Escape quits.

use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::window::{Runtime, RuntimeConfig};
use prism_engine::{Context, Pass, PassOptions, PingPongTarget, TargetOptions, Target, Uniforms};

use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

const FEEDBACK_FS: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let trail = textureSample(prev, prev_sampler, uv).rgb * u.decay;
    let t = globals.time;
    let center = vec2<f32>(0.5 + 0.3 * cos(t), 0.5 + 0.3 * sin(t * 1.3));
    let p = (uv - center) * vec2<f32>(globals.aspect, 1.0);
    let glow = smoothstep(u.radius, 0.0, length(p));
    let hue = 0.5 + 0.5 * cos(vec3<f32>(0.0, 2.1, 4.2) + t);
    return vec4<f32>(trail + hue * glow, 1.0);
}
"#;

const PRESENT_FS: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let c = textureSample(image, image_sampler, uv).rgb;
    return vec4<f32>(c / (c + vec3<f32>(1.0)), 1.0);
}
"#;

struct Feedback {
    buffers: PingPongTarget,
    feedback: Pass,
    present: Pass,
}

struct Studio {
    scene: Option<Feedback>,
}

impl Studio {
    fn frame(&mut self, ctx: &mut Context) -> prism_engine::Result<()> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        scene.feedback.set_uniform(ctx, "prev", &scene.buffers)?;
        ctx.set_target(&scene.buffers)?;
        scene.feedback.draw(ctx)?;
        scene.buffers.swap();

        scene.present.set_uniform(ctx, "image", scene.buffers.read())?;
        ctx.set_target(Target::Screen)?;
        scene.present.draw(ctx)
    }
}

impl App for Studio {
    fn setup(&mut self, ctx: &mut Context) -> anyhow::Result<()> {
        let (w, h) = ctx.size();
        let buffers = ctx.ping_pong(w, h, TargetOptions::format(wgpu::TextureFormat::Rgba16Float))?;
        let feedback = ctx.pass(
            FEEDBACK_FS,
            PassOptions::new().with_label("feedback").with_uniforms(
                Uniforms::new()
                    .set("decay", 0.97)
                    .set("radius", 0.05)
                    .bind("prev", &buffers),
            ),
        )?;
        let present = ctx.pass(
            PRESENT_FS,
            PassOptions::new()
                .with_label("present")
                .with_uniforms(Uniforms::new().bind("image", buffers.read())),
        )?;
        for d in ctx.take_diagnostics() {
            log::error!("{d}");
        }
        self.scene = Some(Feedback { buffers, feedback, present });
        Ok(())
    }

    fn on_window_event(&mut self, ctx: &mut Context, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state: ElementState::Pressed, repeat: false, .. },
                ..
            } => match code {
                KeyCode::Escape => return AppControl::Exit,
                KeyCode::Space => ctx.set_paused(!ctx.paused()),
                _ => {}
            },
            WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                if let Some(scene) = &self.scene {
                    if let Err(e) = scene.buffers.resize(ctx, size.width, size.height) {
                        log::warn!("feedback buffers not resized: {e}");
                    }
                }
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, frame: &mut FrameCtx<'_>) -> AppControl {
        if let Err(e) = self.frame(frame.ctx) {
            log::error!("frame {} failed: {e}", frame.time.frame);
            return AppControl::Exit;
        }
        if frame.time.frame % 120 == 0 {
            if let Some(fps) = frame.ctx.profiler().frame_stats().fps {
                frame.window.set_title(&format!("prism studio · {fps:.0} fps"));
            }
        }
        AppControl::Continue
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    Runtime::run(
        RuntimeConfig { title: "prism studio".to_string(), ..RuntimeConfig::default() },
        Studio { scene: None },
    )
}
