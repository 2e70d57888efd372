/// A swapchain texture acquired for the current frame.
///
/// This object is short-lived and must be presented promptly. Holding the surface
/// texture prevents acquisition of subsequent frames.
pub struct SurfaceFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
