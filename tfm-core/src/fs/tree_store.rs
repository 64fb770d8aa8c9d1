//! src/fs/tree_store.rs
//! ============================================================================
//! # `TreeStore`: ordered cache of known directories
//!
//! Keeps every directory the user has ever visited, sorted under the path
//! collation so a directory's descendants form one contiguous block right
//! after it. The panel listing engine brackets each scan with
//! [`TreeStore::begin_scan`] / [`TreeStore::confirm_child`] /
//! [`TreeStore::commit_scan`], so ordinary navigation keeps the cache fresh
//! without ever walking the whole filesystem: children that a live scan did
//! not confirm are swept, and a confirmed child keeps its previously known
//! subtree without re-stating it.
//!
//! The store is an explicit value owned by the application root; persistence
//! lives in [`crate::fs::tree_file`]. UI widgets holding references into the
//! store register a [`RemovalListener`] to be told, synchronously and before
//! the entry is dropped, that an entry goes away.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::SpecialDirs;
use crate::error::AppError;
use crate::fs::collate::path_cmp;
use crate::fs::tree_entry::TreeEntry;
use crate::fs::vfs::Vfs;

/// Notified for every entry removed from the store. The reference is valid
/// only for the duration of the call.
pub trait RemovalListener {
    fn entry_removed(&mut self, entry: &TreeEntry);
}

/// Handle for unregistering a removal listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// In-flight reconciliation scope between `begin_scan` and `commit_scan`.
/// At most one may be open; they do not nest.
struct ScanScope {
    base: String,
    /// Descendants of `base` not yet confirmed by the live scan.
    pending: HashSet<String>,
}

#[derive(Default)]
pub struct TreeStore {
    /// Sorted under [`path_cmp`]; a subtree is a contiguous index range.
    entries: Vec<TreeEntry>,
    listeners: Vec<(ListenerId, Box<dyn RemovalListener>)>,
    next_listener_id: u64,
    scan: Option<ScanScope>,
    dirty: bool,
}

impl std::fmt::Debug for TreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeStore")
            .field("entries", &self.entries.len())
            .field("listeners", &self.listeners.len())
            .field("scan_open", &self.scan.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl TreeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in collation order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn entry(&self, idx: usize) -> Option<&TreeEntry> {
        self.entries.get(idx)
    }

    /// Unsaved mutations exist.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Exact-match search.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&TreeEntry> {
        self.search(path).ok().map(|idx| &self.entries[idx])
    }

    fn search(&self, path: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| path_cmp(e.path(), path))
    }

    /// Insert a directory, creating missing ancestors. Idempotent: inserting
    /// a present path returns its index unchanged.
    pub fn insert(&mut self, path: &str) -> usize {
        if let Ok(idx) = self.search(path) {
            return idx;
        }

        // Ancestors first so the collation position of `path` is final.
        if let Some(parent) = parent_path(path) {
            self.insert(parent);
        }

        let idx: usize = match self.search(path) {
            Ok(idx) => return idx,
            Err(idx) => idx,
        };

        let entry = TreeEntry::new(path);
        let depth: u32 = entry.depth();
        self.entries.insert(idx, entry);

        // Seed the bitmap from the successor, then claim this depth, keeping
        // only bits at this depth and above.
        let mut bitmap: u64 = self.entries.get(idx + 1).map_or(0, |e| e.bitmap);
        bitmap |= TreeEntry::depth_bit(depth);
        bitmap &= TreeEntry::depth_mask(depth);
        self.entries[idx].bitmap = bitmap;

        // Deeper predecessors now have a sibling continuing past them.
        let mut j: usize = idx;
        while j > 0 && self.entries[j - 1].depth() > depth {
            j -= 1;
            self.entries[j].bitmap |= TreeEntry::depth_bit(depth);
        }

        self.dirty = true;
        idx
    }

    /// Mark a directory as having had its children enumerated.
    pub fn set_scanned(&mut self, path: &str) {
        if let Ok(idx) = self.search(path) {
            if !self.entries[idx].scanned {
                self.entries[idx].scanned = true;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn insert_loaded(&mut self, path: &str, scanned: bool) {
        let idx: usize = self.insert(path);
        self.entries[idx].scanned = scanned;
    }

    /// End of the contiguous descendant block starting right after `idx`.
    fn block_end(&self, idx: usize) -> usize {
        let base: &str = self.entries[idx].path();
        let mut end: usize = idx + 1;

        while end < self.entries.len() && is_descendant(base, self.entries[end].path()) {
            end += 1;
        }

        end
    }

    /// Remove a directory and its entire descendant block. Removing the
    /// filesystem root is refused.
    pub fn remove_subtree(&mut self, path: &str) {
        if path == "/" {
            return;
        }

        let Ok(idx) = self.search(path) else {
            return;
        };

        let end: usize = self.block_end(idx);
        for i in (idx..end).rev() {
            self.remove_at(i);
        }
    }

    /// Unlink one entry, notifying listeners and patching predecessor
    /// bitmaps that existed only because of it.
    fn remove_at(&mut self, idx: usize) {
        {
            let entry: &TreeEntry = &self.entries[idx];
            for (_, listener) in &mut self.listeners {
                listener.entry_removed(entry);
            }
        }

        let depth: u32 = self.entries[idx].depth();
        let mut bitmap: u64 = self.entries.get(idx + 1).map_or(0, |e| e.bitmap);

        let mut j: usize = idx;
        while j > 0 && self.entries[j - 1].depth() > depth {
            j -= 1;
            let d: u32 = self.entries[j].depth();
            bitmap |= TreeEntry::depth_bit(d);
            bitmap &= TreeEntry::depth_mask(d);
            self.entries[j].bitmap = bitmap;
        }

        self.entries.remove(idx);
        self.dirty = true;
    }

    // ------------------------------------------------------------------
    // Mark-and-sweep reconciliation
    // ------------------------------------------------------------------

    /// Open a reconciliation scope: insert `path` if unknown (the caller has
    /// verified it exists) and mark its whole descendant block for removal.
    pub fn begin_scan(&mut self, path: &str) -> Result<(), AppError> {
        if let Some(scope) = &self.scan {
            return Err(AppError::ScanInProgress {
                path: scope.base.clone(),
            });
        }

        let idx: usize = self.insert(path);
        let end: usize = self.block_end(idx);

        let pending: HashSet<String> = self.entries[idx + 1..end]
            .iter()
            .map(|e| e.path().to_owned())
            .collect();

        self.scan = Some(ScanScope {
            base: path.to_owned(),
            pending,
        });

        Ok(())
    }

    /// A live scan saw this child: insert it if absent and clear the removal
    /// mark on it and on its entire previously known subtree. That subtree is
    /// presumed alive without re-scanning it.
    pub fn confirm_child(&mut self, name: &str) {
        if name.is_empty() || name == "." || name == ".." {
            return;
        }

        let base: String = match &self.scan {
            Some(scope) => scope.base.clone(),
            None => {
                debug!("confirm_child({name}) outside of a scan, ignored");
                return;
            }
        };

        let full: String = join_path(&base, name);
        self.insert(&full);

        if let Some(scope) = self.scan.as_mut() {
            scope
                .pending
                .retain(|p| p != &full && !is_descendant(&full, p));
        }
    }

    /// Sweep: remove every descendant the scan did not confirm and close the
    /// scope. Without an open scope this is a no-op.
    pub fn commit_scan(&mut self) {
        let Some(scope) = self.scan.take() else {
            return;
        };

        let mut doomed: Vec<String> = scope.pending.into_iter().collect();
        doomed.sort_by(|a, b| path_cmp(a, b));

        // Tail-first keeps each entry's successor valid for bitmap fixups.
        for path in doomed.iter().rev() {
            if let Ok(idx) = self.search(path) {
                self.remove_at(idx);
            }
        }

        if !doomed.is_empty() {
            debug!(
                "Reconciliation of {} swept {} stale entries",
                scope.base,
                doomed.len()
            );
        }
    }

    /// Reconcile one directory against a live child enumeration. Special
    /// directories are recorded as scanned without reading their children.
    pub fn rescan(
        &mut self,
        path: &str,
        vfs: &dyn Vfs,
        special: &SpecialDirs,
    ) -> Result<(), AppError> {
        if special.matches(path) {
            let idx: usize = self.insert(path);
            self.entries[idx].scanned = true;
            return Ok(());
        }

        self.begin_scan(path)?;

        match vfs.read_dir(Path::new(path)) {
            Ok(names) => {
                for name in &names {
                    let Some(name) = name.to_str() else { continue };

                    let full: String = join_path(path, name);
                    if let Ok(stat) = vfs.symlink_metadata(Path::new(&full)) {
                        if stat.is_dir() {
                            self.confirm_child(name);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Rescan could not enumerate {path}: {e}");
            }
        }

        self.commit_scan();
        self.set_scanned(path);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Removal listeners
    // ------------------------------------------------------------------

    pub fn add_removal_listener(&mut self, listener: Box<dyn RemovalListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_removal_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }
}

/// Join a directory path and a child name.
pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base == "/" {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Strict descendant: `p` is `base` extended by a separator.
fn is_descendant(base: &str, p: &str) -> bool {
    if base == "/" {
        return p.len() > 1 && p.starts_with('/');
    }

    p.len() > base.len() && p.starts_with(base) && p.as_bytes()[base.len()] == b'/'
}

/// Parent directory for ancestor auto-creation. `None` for the root and for
/// its immediate children: depth-1 entries need no ancestor record.
fn parent_path(path: &str) -> Option<&str> {
    let sep: usize = path.rfind('/')?;
    if sep == 0 { None } else { Some(&path[..sep]) }
}
