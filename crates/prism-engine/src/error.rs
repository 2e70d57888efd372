use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Setup-time failures (context init, resource creation) are returned from the
/// creating call. Per-frame failures (`draw`, `dispatch`, readback) are scoped
/// to the failing call and leave the involved objects usable. Shader compile
/// problems are never reported here; they go to the diagnostic channel.
#[derive(Debug, Error)]
pub enum Error {
    /// The platform cannot provide a usable wgpu adapter/device.
    #[error("GPU unavailable: {0:#}")]
    Unsupported(anyhow::Error),

    /// A bound value does not fit the binding plan, or refers to a resource
    /// that no longer exists.
    #[error("binding error in `{program}`: {message}")]
    Binding { program: String, message: String },

    #[error("`{program}` has no uniform named `{name}`")]
    UnknownUniform { program: String, name: String },

    /// Target or texture allocation was rejected.
    #[error("cannot create {what}: {reason}")]
    TargetCreation { what: &'static str, reason: String },

    #[error("readback failed: {0}")]
    Readback(String),

    /// The handle was created by a different `Context`.
    #[error("{0} handle belongs to another context")]
    ForeignHandle(&'static str),

    /// The handle refers to a resource that has been disposed.
    #[error("{0} has been disposed")]
    Disposed(&'static str),

    /// Rejected [`ContextOptions`](crate::ContextOptions).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("texture decode failed: {0}")]
    Texture(#[from] image::ImageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn binding(program: &str, message: impl Into<String>) -> Self {
        Self::Binding { program: program.to_string(), message: message.into() }
    }

    pub(crate) fn target(what: &'static str, reason: impl Into<String>) -> Self {
        Self::TargetCreation { what, reason: reason.into() }
    }
}
