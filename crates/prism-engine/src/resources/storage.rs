use crate::context::Context;
use crate::error::{Error, Result};

use super::ids::{ContextId, ResourceId, ResourceIds, StorageKey};
use super::readback::PendingReadback;

pub(crate) struct StorageEntry {
    pub buffer: wgpu::Buffer,
    pub size: u64,
    pub id: ResourceId,
}

impl StorageEntry {
    pub fn allocate(device: &wgpu::Device, ids: &mut ResourceIds, byte_len: u64) -> Result<Self> {
        if byte_len == 0 {
            return Err(Error::target("storage buffer", "zero length"));
        }
        let size = byte_len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let max = u64::from(device.limits().max_storage_buffer_binding_size);
        if size > max {
            return Err(Error::target(
                "storage buffer",
                format!("{size} bytes exceeds the binding limit of {max}"),
            ));
        }

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism storage"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let id = ids.allocate();
        log::debug!("storage {id:?} allocated: {size} bytes");
        Ok(Self { buffer, size, id })
    }
}

/// Caller-visible storage data, bindable from every program kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StorageBuffer {
    pub(crate) ctx: ContextId,
    pub(crate) key: StorageKey,
}

impl StorageBuffer {
    /// Allocated size in bytes (rounded up to 4).
    pub fn len(&self, ctx: &Context) -> Result<u64> {
        Ok(ctx.registry.storage(*self)?.size)
    }

    pub fn resource_id(&self, ctx: &Context) -> Result<ResourceId> {
        Ok(ctx.registry.storage(*self)?.id)
    }

    /// Queues a write of `data` at `offset`; it lands before the next draw or
    /// dispatch.
    pub fn write(&self, ctx: &Context, offset: u64, data: &[u8]) -> Result<()> {
        let e = ctx.registry.storage(*self)?;
        let end = offset.checked_add(data.len() as u64);
        if end.is_none_or(|end| end > e.size) {
            return Err(Error::binding(
                "storage",
                format!("write of {} bytes at {offset} overruns {} byte buffer", data.len(), e.size),
            ));
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(Error::binding("storage", "writes must be 4-byte aligned"));
        }
        ctx.gpu.queue().write_buffer(&e.buffer, offset, data);
        Ok(())
    }

    pub fn write_pod<T: bytemuck::Pod>(&self, ctx: &Context, offset: u64, data: &[T]) -> Result<()> {
        self.write(ctx, offset, bytemuck::cast_slice(data))
    }

    /// Copies the whole buffer back to the CPU.
    pub fn read(&self, ctx: &Context) -> Result<PendingReadback<Vec<u8>>> {
        let e = ctx.registry.storage(*self)?;
        PendingReadback::buffer(ctx.gpu.device(), ctx.gpu.queue(), &e.buffer, e.size)
    }

    /// Idempotent.
    pub fn dispose(&self, ctx: &mut Context) {
        if self.ctx == ctx.id {
            ctx.registry.remove_storage(self.key);
        }
    }
}
