use std::sync::Arc;

use winit::window::Window;

/// Where a context renders by default.
#[derive(Debug, Clone)]
pub enum SurfaceSource {
    /// Swapchain bound to a window. The window is shared so the surface can
    /// outlive any borrow of it.
    Window(Arc<Window>),
    /// No presentation surface; the default target is an offscreen texture of
    /// this size that can be read back like any other target.
    Headless { width: u32, height: u32 },
}

impl SurfaceSource {
    pub fn headless(width: u32, height: u32) -> Self {
        Self::Headless { width, height }
    }
}

impl From<Arc<Window>> for SurfaceSource {
    fn from(window: Arc<Window>) -> Self {
        Self::Window(window)
    }
}

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and generally appropriate for render loops
    /// paced by the display.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Retry with the software fallback adapter when no hardware adapter is found.
    pub allow_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            allow_fallback_adapter: true,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
