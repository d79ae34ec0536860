//! Unified error type for the cobs library.
//!
//! Library code uses `CobsError` while the CLI layer continues using
//! `anyhow::Result` for convenience.
//!
//! # Error Categories
//!
//! - **Config**: invalid parameters or refusal to overwrite existing output
//! - **Io**: file system operations (open, read, write, mmap)
//! - **Format**: invalid index file (magic bytes, version, truncated body)
//! - **Resource**: the memory budget cannot accommodate the construction
//! - **Internal**: an internal invariant was violated

use std::fmt;
use std::path::PathBuf;

/// Unified error type for the cobs library.
#[derive(Debug)]
pub enum CobsError {
    /// Invalid parameters or unsafe output state.
    Config(String),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },

    /// Invalid file format (magic bytes, version, structure).
    Format { path: PathBuf, detail: String },

    /// The memory budget is too small for the requested construction.
    Resource {
        context: String,
        budget: usize,
        needed: usize,
    },

    /// Internal invariant violated.
    Internal(String),
}

impl fmt::Display for CobsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CobsError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CobsError::Io {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "I/O error during {} on '{}': {}",
                    operation,
                    path.display(),
                    source
                )
            }
            CobsError::Format { path, detail } => {
                write!(f, "Invalid index format in '{}': {}", path.display(), detail)
            }
            CobsError::Resource {
                context,
                budget,
                needed,
            } => {
                write!(
                    f,
                    "Memory budget too small for {}: budget is {} bytes, need at least {}",
                    context, budget, needed
                )
            }
            CobsError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CobsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CobsError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CobsError {
    fn from(err: std::io::Error) -> Self {
        CobsError::Io {
            path: PathBuf::new(),
            operation: "unknown",
            source: err,
        }
    }
}

/// Convenience type alias for Results using CobsError.
pub type Result<T> = std::result::Result<T, CobsError>;

impl CobsError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        CobsError::Config(msg.into())
    }

    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        CobsError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Create a format error.
    pub fn format(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        CobsError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create a resource error.
    pub fn resource(context: impl Into<String>, budget: usize, needed: usize) -> Self {
        CobsError::Resource {
            context: context.into(),
            budget,
            needed,
        }
    }

    /// Create an internal invariant error.
    pub fn internal(msg: impl Into<String>) -> Self {
        CobsError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CobsError::io(
            "/path/to/index.cobs",
            "read",
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/path/to/index.cobs"));
        assert!(msg.contains("read"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_format_error_display() {
        let err = CobsError::format("/path/to/index.cobs", "invalid magic bytes");
        let msg = err.to_string();
        assert!(msg.contains("/path/to/index.cobs"));
        assert!(msg.contains("invalid magic bytes"));
    }

    #[test]
    fn test_resource_error_display() {
        let err = CobsError::resource("one document column", 1024, 4096);
        let msg = err.to_string();
        assert!(msg.contains("1024"));
        assert!(msg.contains("4096"));
    }

    #[test]
    fn test_error_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = CobsError::io("/path", "open", io_err);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: CobsError = io_err.into();
        match err {
            CobsError::Io { operation, .. } => assert_eq!(operation, "unknown"),
            _ => panic!("Expected Io variant"),
        }
    }
}
