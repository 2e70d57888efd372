//! The top-level owner of every GPU object.
//!
//! A [`Context`] holds the device, the frame clock, the default target, the
//! resource and program arenas, the event bus and the profiler. Everything
//! else in the crate is a handle whose methods take the owning context.

mod factory;
mod frame;
pub(crate) mod globals;
mod options;
mod target;

use std::sync::Arc;

use slotmap::SlotMap;

use crate::device::{Gpu, SurfaceFrame, SurfaceSource};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, EventKind, EventTypes, Profiler, SubscriptionId};
use crate::pipeline::cache::LayoutCache;
use crate::pipeline::program::Program;
use crate::pipeline::shader::{create_module, error_chain, ShaderDiagnostic, FULLSCREEN_VS};
use crate::resources::ids::{ContextId, ProgramKey};
use crate::resources::registry::Registry;
use crate::resources::{RenderTarget, ResourceCounts, TargetEntry, TargetOptions};
use crate::time::{Clock, ClockSnapshot};

use globals::GlobalsBinding;

pub use options::ContextOptions;
pub use target::Target;

pub(crate) use target::Attachments;

/// Device, clock, default target and the arenas of everything created
/// through it.
///
/// Dropping the context releases every resource and program it still owns.
/// Handles created by one context are rejected by every other one.
pub struct Context {
    pub(crate) id: ContextId,
    pub(crate) gpu: Gpu,
    pub(crate) registry: Registry,
    pub(crate) programs: SlotMap<ProgramKey, Program>,
    pub(crate) layouts: LayoutCache,
    pub(crate) globals: GlobalsBinding,
    pub(crate) fullscreen_vs: wgpu::ShaderModule,
    pub(crate) clock: Clock,
    pub(crate) events: EventBus,
    pub(crate) profiler: Profiler,
    pub(crate) current: Target,
    /// Offscreen default target; `None` in window mode.
    pub(crate) screen: Option<RenderTarget>,
    /// Swapchain texture held between acquisition and `end_frame`.
    pub(crate) frame: Option<SurfaceFrame>,
    pub(crate) options: ContextOptions,
    program_serial: u64,
    diagnostics_tx: flume::Sender<ShaderDiagnostic>,
    diagnostics_rx: flume::Receiver<ShaderDiagnostic>,
    released: bool,
}

impl Context {
    /// Acquires a device for `surface` and sets up the default target.
    ///
    /// Fails with [`Error::Config`] for inconsistent options, before any
    /// device is requested, and with [`Error::Unsupported`] when no adapter or
    /// device is available.
    pub async fn init(surface: impl Into<SurfaceSource>, options: ContextOptions) -> Result<Self> {
        options.validate()?;
        let source = surface.into();
        let gpu = Gpu::new(&source, &options.gpu).await.map_err(Error::Unsupported)?;
        let id = ContextId::next();

        let (diagnostics_tx, diagnostics_rx) = flume::unbounded();
        let uncaptured = diagnostics_tx.clone();
        gpu.device().on_uncaptured_error(Arc::new(move |err: wgpu::Error| {
            let d = ShaderDiagnostic::device(error_chain(&err));
            log::error!("{d}");
            let _ = uncaptured.send(d);
        }));

        let mut registry = Registry::new(id);
        let screen = match source {
            SurfaceSource::Window(_) => None,
            SurfaceSource::Headless { width, height } => {
                let options = TargetOptions::format(options.headless_format).with_label("screen");
                let mut entry = TargetEntry::allocate(&gpu, &mut registry.ids, width, height, options)?;
                entry.pinned = true;
                Some(registry.insert_target(entry))
            }
        };

        let mut layouts = LayoutCache::default();
        let globals = GlobalsBinding::new(gpu.device(), &mut layouts);
        let fullscreen_vs = create_module(gpu.device(), "prism fullscreen", FULLSCREEN_VS.to_string());
        let size = gpu.size();
        log::info!(
            "context {id:?} ready: {}x{} ({})",
            size.width,
            size.height,
            if screen.is_some() { "headless" } else { "window" }
        );

        Ok(Self {
            id,
            gpu,
            registry,
            programs: SlotMap::with_key(),
            layouts,
            globals,
            fullscreen_vs,
            clock: Clock::with_clamps(options.dt_min, options.dt_max),
            events: EventBus::new(options.events.clone()),
            profiler: Profiler::new(),
            current: Target::Screen,
            screen,
            frame: None,
            options,
            program_serial: 0,
            diagnostics_tx,
            diagnostics_rx,
            released: false,
        })
    }

    /// [`init`](Self::init) driven to completion on the calling thread.
    pub fn init_blocking(surface: impl Into<SurfaceSource>, options: ContextOptions) -> Result<Self> {
        pollster::block_on(Self::init(surface, options))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn device(&self) -> &wgpu::Device {
        self.gpu.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.gpu.queue()
    }

    /// Width of the default target in physical pixels.
    pub fn width(&self) -> u32 {
        self.gpu.size().width
    }

    pub fn height(&self) -> u32 {
        self.gpu.size().height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn is_headless(&self) -> bool {
        !self.gpu.has_surface()
    }

    pub fn auto_clear(&self) -> bool {
        self.options.auto_clear
    }

    pub fn set_auto_clear(&mut self, auto_clear: bool) {
        self.options.auto_clear = auto_clear;
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.options.clear_color = color;
    }

    pub fn resource_counts(&self) -> ResourceCounts {
        self.registry.counts()
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    // ── diagnostics ──────────────────────────────────────────────────────

    pub(crate) fn report(&self, d: ShaderDiagnostic) {
        log::error!("{d}");
        let _ = self.diagnostics_tx.send(d);
    }

    /// Drains shader and device diagnostics reported since the last call.
    pub fn take_diagnostics(&self) -> Vec<ShaderDiagnostic> {
        self.diagnostics_rx.try_iter().collect()
    }

    // ── time ─────────────────────────────────────────────────────────────

    /// Advances the clock from the wall clock. While paused only `frame` moves.
    pub fn update_time(&mut self) -> ClockSnapshot {
        self.clock.update()
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.clock.set_time(seconds);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.clock.set_paused(paused);
    }

    pub fn paused(&self) -> bool {
        self.clock.paused()
    }

    pub fn time(&self) -> f32 {
        self.clock.time()
    }

    pub fn delta_time(&self) -> f32 {
        self.clock.delta_time()
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }

    pub fn clock(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }

    // ── events ───────────────────────────────────────────────────────────

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn on(&mut self, kind: EventKind, callback: impl FnMut(&Event) + Send + 'static) -> SubscriptionId {
        self.events.on(kind, callback)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    pub fn history(&self, types: Option<EventTypes>) -> impl Iterator<Item = &Event> {
        self.events.history(types)
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    /// Releases every program and resource. Equivalent to dropping the context.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let programs = self.programs.len();
        for (_, mut program) in self.programs.drain() {
            program.release();
        }
        self.registry.release_all();
        self.layouts.clear();
        self.frame = None;
        self.screen = None;
        self.globals.buffer.destroy();
        log::debug!("context {:?} released ({programs} programs)", self.id);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("size", &self.size())
            .field("current", &self.current)
            .field("programs", &self.programs.len())
            .field("resources", &self.registry.counts())
            .finish_non_exhaustive()
    }
}
