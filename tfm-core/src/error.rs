//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the Navigation Core
//!
//! Every fallible operation in the crate returns `Result<T, AppError>`. Each
//! variant carries enough context (usually the offending path) for the UI to
//! report the failure without re-deriving it.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Unified error type for directory-navigation operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error retrieving file or directory metadata.
    #[error("Filesystem metadata error on {path:?}: {source}")]
    FsMetadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A directory could not be opened or iterated.
    #[error("Cannot read directory contents of {path:?}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Requested file or directory does not exist.
    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// A path could not be represented as UTF-8 text.
    #[error("Path is not valid UTF-8: {0:?}")]
    InvalidPath(PathBuf),

    /// A reconciliation scan was started while another one is still open.
    #[error("Tree scan already in progress for {path}")]
    ScanInProgress { path: String },

    /// Writing the tree cache file failed.
    #[error("Cannot write tree cache {path:?}: {source}")]
    TreeSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config file I/O error with path.
    #[error("Failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    #[must_use]
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Create a metadata failure error.
    pub fn metadata<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::FsMetadata {
            path: path.into(),
            source,
        }
    }

    /// Create a directory-read failure error.
    pub fn directory_read<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::DirectoryRead {
            path: path.into(),
            source,
        }
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}
