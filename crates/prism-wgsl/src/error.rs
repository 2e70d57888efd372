use std::fmt;

/// A scan error for WGSL binding declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub message: String,
    /// 1-based source line number where the error occurred.
    pub line: usize,
    /// 1-based source column number where the error occurred.
    pub col: usize,
}

impl ScanError {
    pub(crate) fn new(msg: impl Into<String>, line: usize, col: usize) -> Self {
        Self { message: msg.into(), line, col }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wgsl scan error at {}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ScanError {}
