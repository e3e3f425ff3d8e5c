//! Error types for environment operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for environment operations.
pub type EnvResult<T> = Result<T, EnvError>;

/// Errors that can occur during environment operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The path does not exist.
    #[error("not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The path already exists.
    #[error("already exists: {}", path.display())]
    AlreadyExists {
        /// The existing path.
        path: PathBuf,
    },

    /// The operation is not supported by the underlying filesystem.
    ///
    /// Returned by `link_file` when a hard link cannot be created,
    /// typically because source and destination are on different devices.
    #[error("not supported: {message}")]
    NotSupported {
        /// Description of the unsupported operation.
        message: String,
    },

    /// A failure injected by a test environment.
    #[error("injected failure: {message}")]
    Injected {
        /// Description of the injected failure.
        message: String,
    },
}

impl EnvError {
    /// Creates a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported {
            message: message.into(),
        }
    }

    /// Creates an injected failure.
    pub fn injected(message: impl Into<String>) -> Self {
        Self::Injected {
            message: message.into(),
        }
    }

    /// Returns true if this error reports an unsupported operation.
    #[must_use]
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported { .. })
    }

    /// Returns true if this error reports a missing path.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
