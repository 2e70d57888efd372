use std::sync::Arc;

use anyhow::{Context as _, Result};

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::context::{Context, ContextOptions};
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub context: ContextOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            context: ContextOptions::default(),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.commands.push(Command::SetPaused(paused));
    }
}

enum Command {
    SetPaused(bool),
    Exit,
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, creates a [`Context`] on it and drives `app` until
    /// the window closes or the app asks to exit.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState { config, app, window: None, exit_requested: false };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

/// The window and the context rendering into it. The context is declared
/// first so its surface is dropped before the window.
struct WindowEntry {
    ctx: Context,
    window: Arc<Window>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    app: A,
    window: Option<WindowEntry>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let mut ctx = Context::init_blocking(window.clone(), self.config.context.clone())
            .context("GPU initialization failed for window")?;
        self.app.setup(&mut ctx).context("app setup failed")?;

        window.request_redraw();
        self.window = Some(WindowEntry { ctx, window });
        Ok(())
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut runtime: RuntimeCtx) {
        for cmd in runtime.commands.drain(..) {
            match cmd {
                Command::SetPaused(paused) => {
                    if let Some(entry) = self.window.as_mut() {
                        entry.ctx.set_paused(paused);
                    }
                }
                Command::Exit => self.request_exit(event_loop),
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId) {
        let Some(entry) = self.window.as_mut() else {
            return;
        };
        let mut runtime = RuntimeCtx::default();

        let time = entry.ctx.update_time();
        if let Err(e) = entry.ctx.begin_frame() {
            log::error!("cannot begin frame: {e}");
            self.request_exit(event_loop);
            return;
        }

        let control = {
            let mut frame = FrameCtx {
                window: WindowCtx { id: window_id, window: &entry.window },
                ctx: &mut entry.ctx,
                time,
                runtime: &mut runtime,
            };
            self.app.on_frame(&mut frame)
        };

        entry.window.pre_present_notify();
        entry.ctx.end_frame();

        if control == AppControl::Exit {
            runtime.exit();
        }
        self.apply_commands(event_loop, runtime);
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw: shaders animate with `globals.time`.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.window {
            entry.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        let Some(entry) = self.window.as_mut() else {
            return;
        };
        if entry.window.id() != window_id {
            return;
        }

        if self.app.on_window_event(&mut entry.ctx, &event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.window = None;
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Err(e) = entry.ctx.resize(new_size.width, new_size.height) {
                    log::warn!("resize to {}x{} failed: {e}", new_size.width, new_size.height);
                }
                entry.window.request_redraw();
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = entry.window.inner_size();
                if let Err(e) = entry.ctx.resize(size.width, size.height) {
                    log::warn!("resize to {}x{} failed: {e}", size.width, size.height);
                }
                entry.window.request_redraw();
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop, window_id),

            _ => {}
        }
    }
}
