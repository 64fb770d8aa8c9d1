//! src/fs/tree_entry.rs
//! ============================================================================
//! # `TreeEntry`: one known directory in the tree store
//!
//! Besides the path itself an entry carries the attributes the tree widget
//! renders from: its depth, the offset of its last component, a continuation
//! bitmap and the `scanned` flag.
//!
//! Continuation bitmap: bit *i* is set when some later entry in the store
//! still continues at ancestor depth *i*. The widget uses it to decide, for
//! every indentation column, whether to draw a vertical branch line or a
//! blank. The store maintains the bitmaps incrementally on insert and remove.

use crate::fs::collate::PATH_SEP;

/// Depths beyond the bitmap width all share the top bit; branch lines that
/// deep are clipped by any realistic terminal anyway.
const MAX_BITMAP_DEPTH: u32 = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    path: String,
    depth: u32,
    name_off: usize,
    pub(crate) bitmap: u64,
    pub(crate) scanned: bool,
}

impl TreeEntry {
    /// Build an entry from an absolute path, computing depth and the last
    /// component offset. The caller (the store) fills in the bitmap.
    pub(crate) fn new(path: &str) -> Self {
        let mut depth: u32 = 0;
        let mut name_off: usize = 0;

        for (i, b) in path.bytes().enumerate() {
            if b == PATH_SEP {
                depth += 1;
                name_off = i + 1;
            }
        }

        Self {
            path: path.to_owned(),
            depth,
            name_off,
            bitmap: 0,
            scanned: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path component (empty for the filesystem root).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.path[self.name_off..]
    }

    /// Number of path separators; `/` and `/usr` are both depth 1.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    #[must_use]
    pub const fn bitmap(&self) -> u64 {
        self.bitmap
    }

    /// Children have been enumerated at least once.
    #[inline]
    #[must_use]
    pub const fn is_scanned(&self) -> bool {
        self.scanned
    }

    /// Bit for one depth level, saturating at the bitmap width.
    #[inline]
    pub(crate) const fn depth_bit(depth: u32) -> u64 {
        1u64 << min_depth(depth)
    }

    /// Mask keeping only bits at this depth and above it in the hierarchy.
    #[inline]
    pub(crate) const fn depth_mask(depth: u32) -> u64 {
        (2u64 << min_depth(depth)).wrapping_sub(1)
    }
}

const fn min_depth(depth: u32) -> u32 {
    if depth > MAX_BITMAP_DEPTH { MAX_BITMAP_DEPTH } else { depth }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_and_name() {
        let root = TreeEntry::new("/");
        assert_eq!(root.depth(), 1);
        assert_eq!(root.name(), "");

        let usr = TreeEntry::new("/usr");
        assert_eq!(usr.depth(), 1);
        assert_eq!(usr.name(), "usr");

        let bin = TreeEntry::new("/usr/local/bin");
        assert_eq!(bin.depth(), 3);
        assert_eq!(bin.name(), "bin");
    }

    #[test]
    fn test_depth_bit_and_mask() {
        assert_eq!(TreeEntry::depth_bit(1), 0b10);
        assert_eq!(TreeEntry::depth_mask(1), 0b11);
        assert_eq!(TreeEntry::depth_mask(2), 0b111);
        // Saturates instead of overflowing on absurd depths.
        assert_eq!(TreeEntry::depth_bit(200), 1u64 << 63);
    }
}
