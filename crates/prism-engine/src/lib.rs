//! Prism engine crate.
//!
//! Resource and binding middleware over wgpu. A [`Context`] owns the device,
//! the frame clock and every GPU object created through it; [`Pass`],
//! [`Material`] and [`Compute`] programs are built from WGSL source plus named
//! uniforms, and their pipeline and bind-group layouts are derived from the
//! shader text.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod binding;
pub mod resources;
pub mod pipeline;
pub mod events;
pub mod context;
mod error;

pub use binding::{BindingPlan, BindingValue, UniformKind, UniformValue, Uniforms};
pub use context::{Context, ContextOptions, Target};
pub use device::SurfaceSource;
pub use error::{Error, Result};
pub use events::{EventBusOptions, EventKind, EventTypes};
pub use pipeline::{
    BlendMode, Compute, ComputeOptions, Material, MaterialOptions, Pass, PassOptions,
    ShaderDiagnostic,
};
pub use resources::{
    MultiTargetSet, PingPongTarget, Pixels, Region, RenderTarget, Sampler, SamplerOptions,
    StorageBuffer, TargetOptions, Texture, TextureOptions, TextureSource,
};
