//! src/fs/dir_entry.rs
//! ============================================================================
//! # `DirEntry`: one element of a panel listing
//!
//! A `DirEntry` pairs a file name with a numeric stat snapshot and the
//! classification flags the listing engine derives while scanning. The stat
//! snapshot is plain integers so every sort key (size, timestamps, inode)
//! compares without touching the filesystem again.

use std::fs::Metadata;

use bytesize::ByteSize;
use chrono::{DateTime, Local, TimeZone};
use compact_str::CompactString;

// File-type bits from the lstat mode word (POSIX).
const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFLNK: u32 = 0o120_000;
const S_IFSOCK: u32 = 0o140_000;
const S_IFCHR: u32 = 0o020_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFIFO: u32 = 0o010_000;
const S_IXUGO: u32 = 0o111;

/// Numeric stat snapshot of one directory child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStat {
    /// Byte length (0 for directories).
    pub size: u64,

    /// Raw mode word including the file-type bits.
    pub mode: u32,

    pub inode: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,

    /// Seconds since the epoch.
    pub mtime: i64,
    pub atime: i64,
    pub ctime: i64,
}

impl EntryStat {
    /// Snapshot from `std::fs::Metadata` (the result of an `lstat`).
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            size: meta.size(),
            mode: meta.mode(),
            inode: meta.ino(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            mtime: meta.mtime(),
            atime: meta.atime(),
            ctime: meta.ctime(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    #[inline]
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Any execute bit set on a regular file.
    #[inline]
    #[must_use]
    pub const fn is_exec(&self) -> bool {
        self.mode & S_IXUGO != 0
    }

    /// Coarse classification used by the Type sort key: directories first,
    /// then live/stale links, then sockets, devices, fifos, executables and
    /// plain files.
    #[must_use]
    pub fn type_rank(&self, link_to_dir: bool, stale_link: bool) -> u8 {
        match self.mode & S_IFMT {
            S_IFDIR => 0,
            S_IFLNK => {
                if link_to_dir {
                    1
                } else if stale_link {
                    2
                } else {
                    3
                }
            }
            S_IFSOCK => 4,
            S_IFCHR => 5,
            S_IFBLK => 6,
            S_IFIFO => 7,
            _ => {
                if self.is_exec() {
                    8
                } else {
                    9
                }
            }
        }
    }
}

/// One row of a panel listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntry {
    /// File name, no directory component.
    pub name: CompactString,

    /// lstat snapshot.
    pub stat: EntryStat,

    /// Directory proper (not a link to one).
    pub is_dir: bool,

    /// Symlink whose target is a directory.
    pub link_to_dir: bool,

    /// Symlink whose target cannot be stat'ed.
    pub stale_link: bool,

    /// User selection mark, carried across reloads by name.
    pub marked: bool,

    /// The recursive size of this directory has been computed.
    pub size_computed: bool,
}

impl DirEntry {
    /// The fixed `".."` sentinel occupying slot 0 of a listing.
    #[must_use]
    pub fn dot_dot() -> Self {
        Self {
            name: CompactString::const_new(".."),
            stat: EntryStat {
                mode: S_IFDIR | 0o755,
                ..EntryStat::default()
            },
            is_dir: true,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_dot_dot(&self) -> bool {
        self.name == ".."
    }

    /// Directory for sorting purposes: a real directory or a link to one.
    #[inline]
    #[must_use]
    pub const fn is_dirish(&self) -> bool {
        self.is_dir || self.link_to_dir
    }

    /// Executable regular file (exec-first sorting).
    #[inline]
    #[must_use]
    pub fn is_exec(&self) -> bool {
        !self.is_dir && !self.stat.is_symlink() && self.stat.is_exec()
    }

    /// Extension after the last dot; empty for dotfiles and names without one.
    #[must_use]
    pub fn extension(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => "",
            Some(i) => &self.name[i + 1..],
        }
    }

    /// Human-readable size string.
    #[must_use]
    pub fn size_human(&self) -> String {
        ByteSize::b(self.stat.size).to_string()
    }

    /// Format the modification time with a chrono format string.
    #[must_use]
    pub fn format_mtime(&self, fmt: &str) -> String {
        let dt: DateTime<Local> = Local
            .timestamp_opt(self.stat.mtime, 0)
            .single()
            .unwrap_or_else(Local::now);

        dt.format(fmt).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, mode: u32) -> DirEntry {
        DirEntry {
            name: CompactString::new(name),
            stat: EntryStat {
                mode,
                ..EntryStat::default()
            },
            is_dir: mode & S_IFMT == S_IFDIR,
            ..DirEntry::default()
        }
    }

    #[test]
    fn test_dot_dot_is_directory() {
        let dd = DirEntry::dot_dot();
        assert!(dd.is_dot_dot());
        assert!(dd.is_dir);
        assert!(dd.stat.is_dir());
        assert!(!dd.marked);
    }

    #[test]
    fn test_extension() {
        assert_eq!(entry("archive.tar.gz", 0o100_644).extension(), "gz");
        assert_eq!(entry("Makefile", 0o100_644).extension(), "");
        assert_eq!(entry(".bashrc", 0o100_644).extension(), "");
        assert_eq!(entry("a.", 0o100_644).extension(), "");
    }

    #[test]
    fn test_exec_classification() {
        assert!(entry("run.sh", 0o100_755).is_exec());
        assert!(!entry("data.txt", 0o100_644).is_exec());
        // Directories have exec bits but are not "executables".
        assert!(!entry("bin", 0o040_755).is_exec());
    }

    #[test]
    fn test_type_rank_ordering() {
        let dir = EntryStat { mode: 0o040_755, ..EntryStat::default() };
        let exe = EntryStat { mode: 0o100_755, ..EntryStat::default() };
        let file = EntryStat { mode: 0o100_644, ..EntryStat::default() };
        let link = EntryStat { mode: 0o120_777, ..EntryStat::default() };

        assert!(dir.type_rank(false, false) < link.type_rank(true, false));
        assert!(link.type_rank(true, false) < link.type_rank(false, true));
        assert!(link.type_rank(false, true) < exe.type_rank(false, false));
        assert!(exe.type_rank(false, false) < file.type_rank(false, false));
    }
}
