use crate::binding::layout::globals_entries;
use crate::binding::GlobalsUniform;
use crate::pipeline::cache::LayoutCache;

use super::Context;

/// Group-0 resources shared by every program of a context.
pub(crate) struct GlobalsBinding {
    pub buffer: wgpu::Buffer,
    pub layout: wgpu::BindGroupLayout,
    pub group: wgpu::BindGroup,
    /// Stands in for group 0 in programs that only use group 1.
    pub empty_layout: wgpu::BindGroupLayout,
    pub empty_group: wgpu::BindGroup,
}

impl GlobalsBinding {
    pub fn new(device: &wgpu::Device, layouts: &mut LayoutCache) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism globals"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout = layouts.get_or_create(device, globals_entries());
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism globals"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
        });
        let empty_layout = layouts.get_or_create(device, Vec::new());
        let empty_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism empty group"),
            layout: &empty_layout,
            entries: &[],
        });
        Self { buffer, layout, group, empty_layout, empty_group }
    }
}

impl Context {
    /// Uploads the `globals` block for a draw into a target of `size`.
    pub(crate) fn write_globals(&self, size: (u32, u32)) {
        let data = GlobalsUniform::new(size.0, size.1, self.clock.snapshot());
        self.gpu.queue().write_buffer(&self.globals.buffer, 0, bytemuck::bytes_of(&data));
    }
}
