//! WGSL compilation: preamble injection, naga validation, diagnostics.

use std::fmt;

/// Shader role within a program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderRole {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for ShaderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        })
    }
}

/// A shader problem reported through the context's diagnostic channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderDiagnostic {
    /// Program label, or `None` for device-level validation errors.
    pub program: Option<String>,
    pub role: Option<ShaderRole>,
    pub message: String,
    /// 1-based line in the caller's source. `None` when the problem lies in
    /// injected declarations or has no location.
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl ShaderDiagnostic {
    pub(crate) fn device(message: impl Into<String>) -> Self {
        Self { program: None, role: None, message: message.into(), line: None, column: None }
    }
}

/// `err` followed by each of its sources, separated by `": "`.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.program, self.role) {
            (Some(p), Some(r)) => write!(f, "{p} ({r})")?,
            (Some(p), None) => f.write_str(p)?,
            _ => f.write_str("device")?,
        }
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, ":{line}:{col}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Full-screen triangle used as the vertex stage of every pass.
pub(crate) const FULLSCREEN_VS: &str = "\
struct PrismFullscreenOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn prism_fullscreen(@builtin(vertex_index) index: u32) -> PrismFullscreenOut {
    let p = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: PrismFullscreenOut;
    out.position = vec4<f32>(p * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(p.x, 1.0 - p.y);
    return out;
}
";

pub(crate) const FULLSCREEN_ENTRY: &str = "prism_fullscreen";

/// One source file of a program, before injection.
pub(crate) struct ShaderSource<'a> {
    pub role: ShaderRole,
    pub code: &'a str,
}

/// Prepends `preamble` and validates the result with naga. Locations in the
/// returned diagnostic refer to the caller's source.
pub(crate) fn validate(program: &str, role: ShaderRole, preamble: &str, code: &str) -> Result<String, ShaderDiagnostic> {
    let full = format!("{preamble}{code}");
    let offset = preamble.lines().count() as u32;

    let located = |message: String, loc: Option<naga::SourceLocation>| {
        let (line, column) = match loc {
            Some(l) if l.line_number > offset => (Some(l.line_number - offset), Some(l.line_position)),
            _ => (None, None),
        };
        ShaderDiagnostic { program: Some(program.to_string()), role: Some(role), message, line, column }
    };

    let module = naga::front::wgsl::parse_str(&full)
        .map_err(|e| located(e.message().to_string(), e.location(&full)))?;

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&module)
        .map_err(|e| located(error_chain(e.as_inner()), e.location(&full)))?;

    Ok(full)
}

pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_vs_is_valid() {
        assert!(validate("fs", ShaderRole::Vertex, "", FULLSCREEN_VS).is_ok());
    }

    #[test]
    fn preamble_is_prepended() {
        let preamble = "@group(1) @binding(0) var<uniform> tint: vec4<f32>;\n";
        let code = "@fragment fn main() -> @location(0) vec4<f32> { return tint; }";
        let full = validate("p", ShaderRole::Fragment, preamble, code).unwrap();
        assert!(full.starts_with(preamble));
    }

    #[test]
    fn parse_error_reports_caller_line() {
        let preamble = "struct A { x: f32 }\n\n";
        let code = "@fragment fn main() -> @location(0) vec4<f32> {\n    return vec4<f32>(1.0) +;\n}";
        let d = validate("broken", ShaderRole::Fragment, preamble, code).unwrap_err();
        assert_eq!(d.program.as_deref(), Some("broken"));
        assert_eq!(d.role, Some(ShaderRole::Fragment));
        assert_eq!(d.line, Some(2));
    }

    #[test]
    fn validation_error_is_reported() {
        let code = "@fragment fn main() -> @location(0) vec4<f32> { let x: f32 = 1u; return vec4<f32>(x); }";
        let d = validate("typed", ShaderRole::Fragment, "", code).unwrap_err();
        assert!(!d.message.is_empty());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("entry point `main` is invalid")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("local `x` has type u32, expected f32")]
    struct Inner;

    #[test]
    fn error_chain_includes_every_cause() {
        assert_eq!(
            error_chain(&Outer(Inner)),
            "entry point `main` is invalid: local `x` has type u32, expected f32"
        );
        assert_eq!(error_chain(&Inner), "local `x` has type u32, expected f32");
    }

    #[test]
    fn display_includes_location() {
        let d = ShaderDiagnostic {
            program: Some("blur".into()),
            role: Some(ShaderRole::Fragment),
            message: "oops".into(),
            line: Some(3),
            column: Some(7),
        };
        assert_eq!(d.to_string(), "blur (fragment):3:7: oops");
        assert_eq!(ShaderDiagnostic::device("lost").to_string(), "device: lost");
    }
}
