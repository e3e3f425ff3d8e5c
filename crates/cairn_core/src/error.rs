//! Error types for Cairn core.

use cairn_env::EnvError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Cairn core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Environment error (probe, link, copy, rename, sync).
    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The checkpoint target already exists.
    #[error("directory exists: {}", path.display())]
    AlreadyExists {
        /// The existing path.
        path: PathBuf,
    },

    /// The engine reported something that violates its own invariants.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// The request cannot be served in the engine's current configuration.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Another process holds the database lock.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true for I/O class failures (environment or OS errors).
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Env(_) | Self::Io(_))
    }
}
