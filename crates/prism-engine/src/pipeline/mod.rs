//! Programs: full-screen passes, materials and compute.
//!
//! Programs live in the context's arena; [`Pass`], [`Material`] and
//! [`Compute`] are `Copy` handles whose methods take the owning context.

mod blend;
pub(crate) mod cache;
mod compute;
mod handle;
mod material;
mod pass;
pub(crate) mod program;
pub(crate) mod shader;
pub(crate) mod submit;

pub use blend::BlendMode;
pub use cache::CacheStats;
pub use compute::{Compute, ComputeOptions};
pub use material::{Material, MaterialOptions};
pub use pass::{Pass, PassOptions};
pub use shader::{ShaderDiagnostic, ShaderRole};
