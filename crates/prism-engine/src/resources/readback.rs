//! GPU → CPU transfers.
//!
//! Every readback copies into its own staging buffer and maps it
//! asynchronously, so several can be in flight at once. A [`PendingReadback`]
//! is a `Future`; [`PendingReadback::wait`] blocks on the device instead.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context as TaskContext, Poll, Waker};

use crate::error::{Error, Result};

use super::format::{format_info, PixelKind};

/// Pixel rectangle in target coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Readback result: bytes for 8-bit formats, floats for 16/32-bit float
/// formats. Channel order is the texture's own.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl Pixels {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            Self::U8(v) => Some(v),
            Self::F32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            Self::U8(_) => None,
        }
    }
}

#[derive(Default)]
struct MapState {
    result: Option<std::result::Result<(), wgpu::BufferAsyncError>>,
    waker: Option<Waker>,
}

type Finish<T> = Box<dyn FnOnce(&[u8]) -> T + Send>;

/// An in-flight GPU → CPU copy.
#[must_use = "a readback does nothing unless awaited or waited on"]
pub struct PendingReadback<T> {
    device: wgpu::Device,
    staging: wgpu::Buffer,
    state: Arc<Mutex<MapState>>,
    finish: Option<Finish<T>>,
}

impl PendingReadback<Pixels> {
    pub(crate) fn texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        region: Option<Region>,
    ) -> Result<Self> {
        let info = format_info(format)?;
        let region = checked_region(region.unwrap_or(Region::new(0, 0, width, height)), width, height)?;
        let unpadded = region
            .width
            .checked_mul(info.bytes_per_pixel)
            .ok_or_else(|| Error::Readback(format!("row of {} pixels is too large", region.width)))?;
        let padded = padded_bytes_per_row(unpadded);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism readback"),
            size: u64::from(padded) * u64::from(region.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: region.x, y: region.y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(region.height),
                },
            },
            wgpu::Extent3d { width: region.width, height: region.height, depth_or_array_layers: 1 },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let rows = region.height as usize;
        let kind = info.kind;
        Ok(Self::start(
            device,
            staging,
            Box::new(move |mapped| {
                let tight = strip_padding(mapped, unpadded as usize, padded as usize, rows);
                decode_pixels(kind, &tight)
            }),
        ))
    }
}

impl PendingReadback<Vec<u8>> {
    pub(crate) fn buffer(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &wgpu::Buffer,
        size: u64,
    ) -> Result<Self> {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism buffer readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism buffer readback encoder"),
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));
        Ok(Self::start(device, staging, Box::new(|mapped| mapped.to_vec())))
    }
}

impl<T> PendingReadback<T> {
    fn start(device: &wgpu::Device, staging: wgpu::Buffer, finish: Finish<T>) -> Self {
        let state = Arc::new(Mutex::new(MapState::default()));
        let cb_state = state.clone();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let mut s = cb_state.lock().unwrap_or_else(PoisonError::into_inner);
            s.result = Some(result);
            if let Some(waker) = s.waker.take() {
                waker.wake();
            }
        });
        Self { device: device.clone(), staging, state, finish: Some(finish) }
    }

    /// Non-blocking check; drives the device's callback processing.
    pub fn is_ready(&self) -> bool {
        let _ = self.device.poll(wgpu::PollType::Poll);
        self.lock().result.is_some()
    }

    /// Blocks until the copy has landed.
    pub fn wait(mut self) -> Result<T> {
        self.device
            .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
            .map_err(|e| Error::Readback(e.to_string()))?;
        match self.take_result() {
            Some(r) => self.complete(r),
            None => Err(Error::Readback("buffer was not mapped after device wait".into())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_result(&self) -> Option<std::result::Result<(), wgpu::BufferAsyncError>> {
        self.lock().result.take()
    }

    fn complete(&mut self, mapped: std::result::Result<(), wgpu::BufferAsyncError>) -> Result<T> {
        mapped.map_err(|e| Error::Readback(e.to_string()))?;
        let finish = self
            .finish
            .take()
            .ok_or_else(|| Error::Readback("readback already consumed".into()))?;
        let out = {
            let view = self.staging.slice(..).get_mapped_range();
            finish(&view)
        };
        self.staging.unmap();
        Ok(out)
    }
}

impl<T> Future for PendingReadback<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _ = this.device.poll(wgpu::PollType::Poll);

        let ready = {
            let mut s = this.lock();
            match s.result.take() {
                Some(r) => Some(r),
                None => {
                    s.waker = Some(cx.waker().clone());
                    None
                }
            }
        };
        match ready {
            Some(r) => Poll::Ready(this.complete(r)),
            None => {
                // Native backends only fire map callbacks from `poll`, so keep
                // the executor spinning until the copy lands.
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }
}

impl<T> Drop for PendingReadback<T> {
    fn drop(&mut self) {
        self.staging.destroy();
    }
}

/// Rejects empty regions and regions reaching past `width` x `height`.
fn checked_region(region: Region, width: u32, height: u32) -> Result<Region> {
    let right = region.x.checked_add(region.width);
    let bottom = region.y.checked_add(region.height);
    let inside = matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height);
    if region.width == 0 || region.height == 0 || !inside {
        return Err(Error::Readback(format!("region {region:?} outside {width}x{height} target")));
    }
    Ok(region)
}

pub(crate) fn padded_bytes_per_row(unpadded: u32) -> u32 {
    unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

fn strip_padding(mapped: &[u8], unpadded: usize, padded: usize, rows: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(unpadded * rows);
    for row in mapped.chunks(padded).take(rows) {
        out.extend_from_slice(&row[..unpadded]);
    }
    out
}

fn decode_pixels(kind: PixelKind, bytes: &[u8]) -> Pixels {
    match kind {
        PixelKind::U8 => Pixels::U8(bytes.to_vec()),
        PixelKind::F16 => Pixels::F32(
            bytes
                .chunks_exact(2)
                .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
                .collect(),
        ),
        PixelKind::F32 => Pixels::F32(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    }
}
