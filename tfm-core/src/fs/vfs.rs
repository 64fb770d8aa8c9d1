//! src/fs/vfs.rs
//! ============================================================================
//! # `Vfs`: filesystem collaborator seam
//!
//! The navigation core consumes a POSIX-like view of the filesystem through
//! this trait so the transport layer (local disk, ftp, archives) stays
//! replaceable and tests can run against a scripted filesystem. Iteration
//! order of `read_dir` is unspecified; the listing engine sorts afterwards.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::fs::dir_entry::EntryStat;

pub trait Vfs {
    /// Child names of a directory, excluding `.` and `..`.
    fn read_dir(&self, path: &Path) -> Result<Vec<OsString>, AppError>;

    /// `lstat`: metadata of the entry itself, never following links.
    fn symlink_metadata(&self, path: &Path) -> Result<EntryStat, AppError>;

    /// `stat`: metadata of the link target.
    fn metadata(&self, path: &Path) -> Result<EntryStat, AppError>;

    /// Whether the path belongs to the local filesystem. Only local paths are
    /// persisted in the tree cache.
    fn is_local(&self, path: &str) -> bool;
}

/// Local-disk backend over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Vfs for LocalFs {
    fn read_dir(&self, path: &Path) -> Result<Vec<OsString>, AppError> {
        let mut names: Vec<OsString> = Vec::new();

        for entry in fs::read_dir(path).map_err(|e| AppError::directory_read(path, e))? {
            let entry = entry.map_err(|e| AppError::directory_read(path, e))?;
            names.push(entry.file_name());
        }

        Ok(names)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<EntryStat, AppError> {
        let meta = fs::symlink_metadata(path).map_err(|e| AppError::metadata(path, e))?;
        Ok(EntryStat::from_metadata(&meta))
    }

    fn metadata(&self, path: &Path) -> Result<EntryStat, AppError> {
        let meta = fs::metadata(path).map_err(|e| AppError::metadata(path, e))?;
        Ok(EntryStat::from_metadata(&meta))
    }

    fn is_local(&self, _path: &str) -> bool {
        true
    }
}
