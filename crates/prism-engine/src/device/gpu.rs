use anyhow::{Context as _, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;

use super::frame::SurfaceFrame;
use super::init::{GpuInit, SurfaceSource};
use super::surface::{
    apply_resize, choose_alpha_mode, choose_surface_format, map_surface_error, SurfaceErrorAction,
    SurfaceState,
};

/// Owns wgpu core objects and, in window mode, the surface configuration.
///
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swapchain) when a window is given
/// - acquires and presents swapchain frames
pub struct Gpu {
    /// Kept alive for the lifetime of the surface.
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: Option<SurfaceState>,

    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,
}

impl Gpu {
    /// Acquires an adapter and device, and configures the window surface if any.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(source: &SurfaceSource, init: &GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let (surface, size) = match source {
            SurfaceSource::Window(window) => {
                let size = window.inner_size();
                anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");
                let surface = instance
                    .create_surface(window.clone())
                    .context("failed to create wgpu surface")?;
                (Some(surface), size)
            }
            SurfaceSource::Headless { width, height } => {
                anyhow::ensure!(*width > 0 && *height > 0, "headless target has zero size");
                (None, PhysicalSize::new(*width, *height))
            }
        };

        let adapter = request_adapter(&instance, surface.as_ref(), init).await?;
        let info = adapter.get_info();
        log::info!("using adapter `{}` ({:?})", info.name, info.backend);

        // Adapter-specific format features make float formats renderable
        // where the hardware allows it.
        let optional = adapter.features() & wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: init.required_features | optional,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let format = choose_surface_format(&caps, init.prefer_srgb)
                    .context("no supported surface formats")?;
                let config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.width,
                    height: size.height,
                    present_mode: init.present_mode,
                    alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
                    view_formats: vec![],
                    desired_maximum_frame_latency: init.desired_maximum_frame_latency,
                };
                surface.configure(&device, &config);
                Some(SurfaceState { surface, config })
            }
            None => None,
        };

        Ok(Gpu { _instance: instance, adapter, device, queue, surface, size })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Texture usages `format` supports on this device.
    ///
    /// Without `TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES` the device only
    /// accepts the guaranteed set, further narrowed by what the adapter reports.
    pub fn format_usages(&self, format: wgpu::TextureFormat) -> wgpu::TextureUsages {
        let features = self.device.features();
        let adapter = self.adapter.get_texture_format_features(format).allowed_usages;
        if features.contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES) {
            adapter
        } else {
            adapter & format.guaranteed_format_features(features).allowed_usages
        }
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Swapchain format, `None` when headless.
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|s| s.config.format)
    }

    /// Reconfigures the surface after a resize. Headless devices only track the size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        match self.surface.as_mut() {
            Some(state) => apply_resize(state, &self.device, &mut self.size, new_size),
            None => self.size = new_size,
        }
    }

    /// Acquires the next swapchain texture. Headless devices have nothing to
    /// acquire and return `Ok(None)`.
    pub fn acquire_frame(&self) -> std::result::Result<Option<SurfaceFrame>, SurfaceError> {
        let Some(state) = self.surface.as_ref() else {
            return Ok(None);
        };
        let surface_texture = state.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Some(SurfaceFrame { surface_texture, view }))
    }

    /// Presents a previously acquired frame. All work targeting it must have
    /// been submitted already.
    pub fn present(&self, frame: SurfaceFrame) {
        drop(frame.view);
        frame.surface_texture.present();
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match self.surface.as_ref() {
            Some(state) => map_surface_error(state, &self.device, self.size, err),
            None => SurfaceErrorAction::SkipFrame,
        }
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
    init: &GpuInit,
) -> Result<wgpu::Adapter> {
    let hardware = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await;

    match hardware {
        Ok(adapter) => Ok(adapter),
        Err(err) if init.allow_fallback_adapter => {
            log::warn!("no hardware adapter ({err}); retrying with fallback adapter");
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: init.power_preference,
                    compatible_surface: surface,
                    force_fallback_adapter: true,
                })
                .await
                .context("failed to find a suitable GPU adapter")
        }
        Err(err) => Err(err).context("failed to find a suitable GPU adapter"),
    }
}
