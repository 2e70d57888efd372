//! Tokenizer and binding scanner for the WGSL conventions used by **prism**.
//!
//! This crate is intentionally dependency-free so it can be consumed by
//! editor tooling and build scripts without pulling in any GPU code. It does
//! not compile or validate shaders; it only extracts the facts the binder
//! needs to synthesize layouts.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`error`] | `ScanError` |
//! | [`lexer`] | `Lexer`, `Token` |
//! | [`scanner`] | `scan` entry point, `ShaderScan`, `Declaration`, `EntryPoint` |
//! | [`types`] | `WgslType`, `Scalar`, `Access` |
//!
//! # Quick start
//!
//! ```rust
//! use prism_wgsl::{scan, Stage};
//!
//! let src = r#"
//!     @group(1) @binding(0) var<uniform> tint: vec4f;
//!     @fragment fn main() -> @location(0) vec4f {
//!         return tint * sin(globals.time);
//!     }
//! "#;
//!
//! let scan = scan(src).unwrap();
//! assert!(scan.declares("tint"));
//! assert_eq!(scan.members_of("globals").collect::<Vec<_>>(), ["time"]);
//! assert_eq!(scan.entry_point(Stage::Fragment).unwrap().name, "main");
//! ```

pub mod error;
pub mod lexer;
pub mod scanner;
pub mod types;

pub use error::ScanError;
pub use scanner::{
    scan, AddressSpace, Declaration, EntryPoint, ShaderScan, Stage, StructDecl, StructMember,
};
pub use types::{Access, Scalar, WgslType};
