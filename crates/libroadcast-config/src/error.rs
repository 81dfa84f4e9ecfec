//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem access to the credentials store failed.
    #[error("failed to {operation} credentials at {}", .path.display())]
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// File or directory involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Stored credentials could not be decoded or encoded.
    #[error("credentials file {} is malformed", .path.display())]
    Malformed {
        /// File involved.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("cannot locate the home directory (set HOME)")]
    HomeDirectoryMissing,
}

/// Convenience result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
