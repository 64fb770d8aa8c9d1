//! src/fs/listing.rs
//! ============================================================================
//! # `ListingEngine`: panel directory listings
//!
//! Loads one directory's children into a [`DirList`], classifying each entry
//! (directory, symlink-to-directory, stale link) as it goes, and sorts the
//! result under a pluggable key. A reload carries selection marks forward by
//! file name. Every scan is bracketed with the tree store's
//! `begin_scan`/`confirm_child`/`commit_scan` triple, so plain panel
//! navigation doubles as tree reconciliation.
//!
//! Everything here is synchronous and runs on the caller's thread; on a slow
//! VFS backend the only concession is the periodic progress callback (a busy
//! indicator), never real concurrency.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::fs::dir_entry::DirEntry;
use crate::fs::tree_store::TreeStore;
use crate::fs::vfs::Vfs;

/// Listing arrays grow in fixed chunks rather than doubling; directory sizes
/// cluster well below a few chunks.
const RESIZE_STEP: usize = 128;

/// Secondary sort key; the primary key is always the directory/file
/// partition unless `mix_all_files` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Keep the scan order.
    Unsorted,
    #[default]
    Name,
    /// Extension, ties broken by name.
    Extension,
    MTime,
    ATime,
    CTime,
    Size,
    Inode,
    /// Coarse file-type rank (dir, link, socket, device, fifo, exe, file).
    Type,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &str = match self {
            Self::Unsorted => "unsorted",
            Self::Name => "name",
            Self::Extension => "extension",
            Self::MTime => "mtime",
            Self::ATime => "atime",
            Self::CTime => "ctime",
            Self::Size => "size",
            Self::Inode => "inode",
            Self::Type => "type",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Flip the secondary key. The directory/file partition is never flipped.
    pub reverse: bool,
    pub case_sensitive: bool,
    /// Disable the directory/file partition entirely.
    pub mix_all_files: bool,
    /// Within the file block, executables before plain files.
    pub exec_first: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            reverse: false,
            case_sensitive: true,
            mix_all_files: false,
            exec_first: false,
        }
    }
}

/// One panel's listing. Slot 0 is the `".."` sentinel except when listing
/// the filesystem root; sorting never moves it.
#[derive(Debug, Clone, Default)]
pub struct DirList {
    pub entries: Vec<DirEntry>,
}

impl DirList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The listing shown when a directory cannot be read at all.
    #[must_use]
    pub fn unreadable() -> Self {
        Self {
            entries: vec![DirEntry::dot_dot()],
        }
    }

    pub fn push(&mut self, entry: DirEntry) {
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve(RESIZE_STEP);
        }
        self.entries.push(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter()
    }

    /// Entries carrying a selection mark.
    pub fn marked(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| e.marked)
    }
}

/// Visibility predicates applied while scanning.
#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    pub show_hidden: bool,
    pub show_backups: bool,

    /// Applied to file names only; directories are always listed.
    pub name_filter: Option<Regex>,

    /// Busy-indicator cadence, in scanned entries.
    pub progress_every: usize,
}

pub struct ListingEngine {
    pub options: ListingOptions,
    pub sort_key: SortKey,
    pub sort_options: SortOptions,
}

impl ListingEngine {
    #[must_use]
    pub fn new(options: ListingOptions, sort_key: SortKey, sort_options: SortOptions) -> Self {
        Self {
            options: ListingOptions {
                progress_every: options.progress_every.max(1),
                ..options
            },
            sort_key,
            sort_options,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ListingOptions {
                show_hidden: config.listing.show_hidden,
                show_backups: config.listing.show_backups,
                name_filter: None,
                progress_every: config.listing.progress_every,
            },
            SortKey::Name,
            SortOptions {
                reverse: false,
                case_sensitive: config.listing.case_sensitive,
                mix_all_files: config.listing.mix_all_files,
                exec_first: config.listing.exec_first,
            },
        )
    }

    /// Initial load of a directory. On failure the caller keeps whatever it
    /// had (typically [`DirList::unreadable`] for a fresh panel).
    pub fn load(
        &self,
        vfs: &dyn Vfs,
        tree: &mut TreeStore,
        path: &Path,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<DirList, AppError> {
        self.scan(vfs, tree, path, None, progress)
    }

    /// Re-scan a directory, carrying the selection marks of `previous`
    /// forward by file name. `previous` is only read; on failure it stays
    /// the current listing.
    pub fn reload(
        &self,
        vfs: &dyn Vfs,
        tree: &mut TreeStore,
        path: &Path,
        previous: &DirList,
        progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<DirList, AppError> {
        self.scan(vfs, tree, path, Some(previous), progress)
    }

    /// Sort a listing in place under this engine's current key.
    pub fn sort(&self, list: &mut DirList) {
        sort_dir_list(list, self.sort_key, &self.sort_options);
    }

    fn scan(
        &self,
        vfs: &dyn Vfs,
        tree: &mut TreeStore,
        path: &Path,
        previous: Option<&DirList>,
        mut progress: Option<&mut dyn FnMut(usize)>,
    ) -> Result<DirList, AppError> {
        let path_str: &str = path
            .to_str()
            .ok_or_else(|| AppError::InvalidPath(path.to_path_buf()))?;

        // Open the directory before touching the tree: a failure here must
        // leave the cached subtree exactly as it was.
        let names = vfs.read_dir(path)?;

        tree.begin_scan(path_str)?;

        // Index the previous listing's marks by file name.
        let marked_names: HashSet<&str> = previous
            .into_iter()
            .flat_map(|prev| prev.marked().map(|e| e.name.as_str()))
            .collect();
        let mut marks_left: usize = marked_names.len();

        let mut list = DirList::new();
        let mut processed: usize = 0;

        for name_os in &names {
            let Some(name) = name_os.to_str() else {
                debug!("Skipping non-UTF8 entry {:?} in {:?}", name_os, path);
                continue;
            };

            if name == "." || name == ".." {
                continue;
            }
            if !self.options.show_hidden && name.starts_with('.') {
                continue;
            }
            if !self.options.show_backups && name.ends_with('~') {
                continue;
            }

            let full: PathBuf = path.join(name);
            let stat = match vfs.symlink_metadata(&full) {
                Ok(stat) => stat,
                Err(e) => {
                    // A vanished or unstatable child does not abort the scan.
                    warn!("Skipping {:?}: {e}", full);
                    continue;
                }
            };

            let is_dir: bool = stat.is_dir();
            if is_dir {
                tree.confirm_child(name);
            }

            let mut link_to_dir: bool = false;
            let mut stale_link: bool = false;
            if stat.is_symlink() {
                match vfs.metadata(&full) {
                    Ok(target) => link_to_dir = target.is_dir(),
                    Err(_) => stale_link = true,
                }
            }

            if !(is_dir || link_to_dir) {
                if let Some(filter) = &self.options.name_filter {
                    if !filter.is_match(name) {
                        continue;
                    }
                }
            }

            let mut entry = DirEntry {
                name: CompactString::new(name),
                stat,
                is_dir,
                link_to_dir,
                stale_link,
                marked: false,
                size_computed: false,
            };

            if marks_left > 0 && marked_names.contains(name) {
                entry.marked = true;
                marks_left -= 1;
            }

            list.push(entry);

            processed += 1;
            if processed % self.options.progress_every == 0 {
                if let Some(cb) = progress.as_deref_mut() {
                    cb(processed);
                }
            }
        }

        tree.commit_scan();

        if path_str != "/" {
            let mut dot_dot = DirEntry::dot_dot();
            if let Some(parent) = path.parent() {
                if let Ok(stat) = vfs.metadata(parent) {
                    dot_dot.stat = stat;
                }
            }
            list.entries.insert(0, dot_dot);
        }

        sort_dir_list(&mut list, self.sort_key, &self.sort_options);
        Ok(list)
    }
}

// ----------------------------------------------------------------------
// Sorting
// ----------------------------------------------------------------------

/// Case-folded collation keys for one sort pass. Built in a buffer parallel
/// to the entries and dropped when the pass ends; entries themselves stay
/// untouched.
#[derive(Default)]
struct SortScratch {
    folded_name: Option<String>,
    folded_ext: Option<String>,
}

impl SortScratch {
    fn build(entry: &DirEntry, key: SortKey, opts: &SortOptions) -> Self {
        if opts.case_sensitive {
            return Self::default();
        }

        match key {
            SortKey::Name => Self {
                folded_name: Some(entry.name.as_str().to_lowercase()),
                folded_ext: None,
            },
            SortKey::Extension => Self {
                folded_name: Some(entry.name.as_str().to_lowercase()),
                folded_ext: Some(entry.extension().to_lowercase()),
            },
            _ => Self::default(),
        }
    }
}

/// In-place sort of everything but the fixed `".."` sentinel.
pub fn sort_dir_list(list: &mut DirList, key: SortKey, opts: &SortOptions) {
    if key == SortKey::Unsorted {
        return;
    }

    let start: usize = usize::from(list.entries.first().is_some_and(DirEntry::is_dot_dot));
    let tail: Vec<DirEntry> = list.entries.split_off(start);

    let mut decorated: Vec<(SortScratch, DirEntry)> = tail
        .into_iter()
        .map(|e| (SortScratch::build(&e, key, opts), e))
        .collect();

    decorated.sort_by(|(ka, a), (kb, b)| compare(a, ka, b, kb, key, opts));

    list.entries
        .extend(decorated.into_iter().map(|(_, e)| e));
}

/// Primary partition: directories, then (optionally) executables, then the
/// rest. Collapsed to one class by `mix_all_files`.
fn primary_class(entry: &DirEntry, opts: &SortOptions) -> u8 {
    if opts.mix_all_files || entry.is_dirish() {
        0
    } else if opts.exec_first && entry.is_exec() {
        1
    } else {
        2
    }
}

fn compare(
    a: &DirEntry,
    ka: &SortScratch,
    b: &DirEntry,
    kb: &SortScratch,
    key: SortKey,
    opts: &SortOptions,
) -> Ordering {
    let class: Ordering = primary_class(a, opts).cmp(&primary_class(b, opts));
    if class != Ordering::Equal {
        return class;
    }

    let secondary: Ordering = match key {
        SortKey::Unsorted => Ordering::Equal,
        SortKey::Name => name_cmp(a, ka, b, kb),
        SortKey::Extension => ext_cmp(a, ka, b, kb).then_with(|| name_cmp(a, ka, b, kb)),
        SortKey::MTime => a.stat.mtime.cmp(&b.stat.mtime),
        SortKey::ATime => a.stat.atime.cmp(&b.stat.atime),
        SortKey::CTime => a.stat.ctime.cmp(&b.stat.ctime),
        SortKey::Size => a.stat.size.cmp(&b.stat.size),
        SortKey::Inode => a.stat.inode.cmp(&b.stat.inode),
        SortKey::Type => {
            let ra: u8 = a.stat.type_rank(a.link_to_dir, a.stale_link);
            let rb: u8 = b.stat.type_rank(b.link_to_dir, b.stale_link);
            ra.cmp(&rb)
        }
    };

    if opts.reverse { secondary.reverse() } else { secondary }
}

fn name_cmp(a: &DirEntry, ka: &SortScratch, b: &DirEntry, kb: &SortScratch) -> Ordering {
    match (&ka.folded_name, &kb.folded_name) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.name.cmp(&b.name),
    }
}

fn ext_cmp(a: &DirEntry, ka: &SortScratch, b: &DirEntry, kb: &SortScratch) -> Ordering {
    match (&ka.folded_ext, &kb.folded_ext) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.extension().cmp(b.extension()),
    }
}

// ----------------------------------------------------------------------
// Panel
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStatus {
    #[default]
    Empty,
    Loaded,
    Reloading,
}

/// One panel's navigation state: the cwd, its listing and the last error.
#[derive(Default)]
pub struct Panel {
    pub cwd: PathBuf,
    pub list: DirList,
    pub status: PanelStatus,
    pub last_error: Option<String>,
}

impl Panel {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            list: DirList::new(),
            status: PanelStatus::Empty,
            last_error: None,
        }
    }

    /// Enter a directory. An unreadable directory leaves the panel showing a
    /// `".."`-only listing with the error recorded.
    pub fn load(&mut self, engine: &ListingEngine, vfs: &dyn Vfs, tree: &mut TreeStore) {
        match engine.load(vfs, tree, &self.cwd, None) {
            Ok(list) => {
                self.list = list;
                self.status = PanelStatus::Loaded;
                self.last_error = None;
            }
            Err(e) => {
                self.list = DirList::unreadable();
                self.status = PanelStatus::Loaded;
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Refresh the current directory. On failure the previous listing stays.
    pub fn reload(&mut self, engine: &ListingEngine, vfs: &dyn Vfs, tree: &mut TreeStore) {
        self.status = PanelStatus::Reloading;

        match engine.reload(vfs, tree, &self.cwd, &self.list, None) {
            Ok(list) => {
                self.list = list;
                self.last_error = None;
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
            }
        }

        self.status = PanelStatus::Loaded;
    }
}
