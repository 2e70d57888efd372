//! Uniform vocabulary and the binding plan derived from shader source.
//!
//! A program's plan is computed once at creation from its scanned WGSL and
//! the uniform dictionary it was created with; it never changes afterwards.

mod globals;
mod kind;
pub(crate) mod layout;
mod packing;
pub(crate) mod plan;
mod value;

pub use globals::{GlobalField, GlobalsUniform, GLOBALS_NAME};
pub use kind::{UniformDescriptor, UniformKind};
pub use packing::BlockField;
pub use plan::{BindingPlan, ProgramStage, Slot, UniformBlock, BLOCK_NAME};
pub use value::{BindingValue, TextureRef, UniformStyle, UniformValue, Uniforms};

pub(crate) use packing::{pack_value, slot_size};
