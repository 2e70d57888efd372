//! GPU resources owned by a context.
//!
//! Every resource lives in the context's registry arena; the public types
//! here are small `Copy` handles (or, for ping-pong and MRT sets, plain
//! structs of handles) whose methods take the owning context.

pub(crate) mod format;
pub(crate) mod ids;
mod mrt;
mod ping_pong;
mod readback;
pub(crate) mod registry;
mod sampler;
mod storage;
mod target;
mod texture;

pub use format::PixelKind;
pub use ids::{ContextId, ResourceId};
pub use mrt::MultiTargetSet;
pub use ping_pong::PingPongTarget;
pub use readback::{PendingReadback, Pixels, Region};
pub use registry::ResourceCounts;
pub use sampler::{Sampler, SamplerOptions};
pub use storage::StorageBuffer;
pub use target::{RenderTarget, TargetOptions};
pub use texture::{Texture, TextureOptions, TextureSource};

pub(crate) use storage::StorageEntry;
pub(crate) use target::TargetEntry;
pub(crate) use texture::TextureEntry;
