//! src/fs/tree_file.rs
//! ============================================================================
//! # Tree-cache persistence
//!
//! Line-oriented text format. The first line is a fixed signature; every
//! following line is `<scanned:0|1>:<form>` where `<form>` is either a
//! literal absolute path or `<N> <suffix>` — front-coding against the
//! previously stored path: `N` is the decimal count of shared leading bytes,
//! `<suffix>` the remainder. Since the writer emits entries in collation
//! order, adjacent paths share long prefixes and most lines compress.
//! Newlines and backslashes inside paths are two-character-escaped, so one
//! line is always one record.
//!
//! Loading is best-effort: a malformed line is skipped, a missing file or a
//! bad signature just means "no saved tree". Saving goes through a temp file
//! and an atomic rename. Only local-filesystem paths are persisted.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::SpecialDirs;
use crate::error::AppError;
use crate::fs::collate::common_prefix_len;
use crate::fs::tree_store::TreeStore;
use crate::fs::vfs::Vfs;

const TREE_SIGNATURE: &str = "tfm tree cache v1";

/// Shared-prefix length above which the front-coded form is chosen.
const COMPRESS_THRESHOLD: usize = 2;

fn encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len());

    for c in path.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }

    out
}

fn decode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

impl TreeStore {
    /// Load the tree cache, falling back to a store bootstrapped with just
    /// the filesystem root (eagerly reconciled once) when the file is
    /// missing, unreadable or carries the wrong signature.
    pub fn load(path: &Path, vfs: &dyn Vfs, special: &SpecialDirs) -> Self {
        let mut store = Self::new();
        let mut loaded = false;

        if let Ok(raw) = fs::read_to_string(path) {
            let mut lines = raw.lines();

            if lines.next() == Some(TREE_SIGNATURE) {
                let mut prev = String::new();

                for line in lines {
                    if let Some(full) = parse_record(line, &mut prev) {
                        let (scanned, full) = full;
                        if vfs.is_local(&full) {
                            store.insert_loaded(&full, scanned);
                        }
                    }
                }

                loaded = true;
                info!("Loaded {} tree entries from {:?}", store.len(), path);
            } else {
                info!("Tree cache {:?} has an unknown signature, ignoring", path);
            }
        }

        if store.is_empty() {
            store.insert("/");
            if let Err(e) = store.rescan("/", vfs, special) {
                warn!("Initial rescan of / failed: {e}");
            }
            loaded = false;
        }

        if loaded {
            store.mark_clean();
        }

        store
    }

    /// Atomically write the cache: temp file in the target directory, then
    /// rename over the destination.
    pub fn save(&mut self, path: &Path, vfs: &dyn Vfs) -> Result<(), AppError> {
        let dir: &Path = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| AppError::TreeSave {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut tmp: NamedTempFile = NamedTempFile::new_in(dir).map_err(|e| AppError::TreeSave {
            path: path.to_path_buf(),
            source: e,
        })?;

        write_records(tmp.as_file_mut(), self, vfs).map_err(|e| AppError::TreeSave {
            path: path.to_path_buf(),
            source: e,
        })?;

        tmp.persist(path)
            .map_err(|e| AppError::TreeSave {
                path: path.to_path_buf(),
                source: e.error,
            })?;

        self.mark_clean();
        info!("Saved tree cache to {:?}", path);
        Ok(())
    }
}

fn write_records(out: &mut fs::File, store: &TreeStore, vfs: &dyn Vfs) -> std::io::Result<()> {
    writeln!(out, "{TREE_SIGNATURE}")?;

    let mut prev: Option<&str> = None;
    for entry in store.iter() {
        let cur: &str = entry.path();
        if !vfs.is_local(cur) {
            continue;
        }

        let scanned: u8 = u8::from(entry.is_scanned());

        let mut common: usize = prev.map_or(0, |p| common_prefix_len(p, cur));
        while !cur.is_char_boundary(common) {
            common -= 1;
        }

        if common > COMPRESS_THRESHOLD {
            writeln!(out, "{scanned}:{common} {}", encode(&cur[common..]))?;
        } else {
            writeln!(out, "{scanned}:{}", encode(cur))?;
        }

        prev = Some(cur);
    }

    out.flush()
}

/// One data line -> (scanned, absolute path). `prev` carries the previously
/// decoded path for front-coded records. Returns `None` for malformed lines.
fn parse_record(line: &str, prev: &mut String) -> Option<(bool, String)> {
    let mut bytes = line.bytes();
    let scanned: bool = match bytes.next() {
        Some(b'0') => false,
        Some(b'1') => true,
        _ => return None,
    };
    if bytes.next() != Some(b':') {
        return None;
    }

    let form: &str = &line[2..];

    let full: String = if form.starts_with('/') {
        decode(form)
    } else {
        // Front-coded: "<N> <suffix>" against the previous record.
        let (count, suffix) = form.split_once(' ')?;
        let common: usize = count.parse().ok()?;
        if common > prev.len() || !prev.is_char_boundary(common) {
            return None;
        }
        format!("{}{}", &prev[..common], decode(suffix))
    };

    if !full.starts_with('/') {
        return None;
    }

    *prev = full.clone();
    Some((scanned, full))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use tempfile::TempDir;

    use crate::fs::dir_entry::EntryStat;

    /// Scripted filesystem: maps directory paths to child names; every child
    /// that is itself a key is a directory. Paths under `remote` prefixes are
    /// not local.
    struct FakeVfs {
        dirs: HashMap<String, Vec<String>>,
        remote: Vec<String>,
    }

    impl FakeVfs {
        fn new(dirs: &[(&str, &[&str])]) -> Self {
            Self {
                dirs: dirs
                    .iter()
                    .map(|(d, cs)| (d.to_string(), cs.iter().map(|c| c.to_string()).collect()))
                    .collect(),
                remote: Vec::new(),
            }
        }

        fn with_remote(mut self, prefix: &str) -> Self {
            self.remote.push(prefix.to_string());
            self
        }
    }

    impl Vfs for FakeVfs {
        fn read_dir(&self, path: &Path) -> Result<Vec<OsString>, AppError> {
            let key = path.to_str().unwrap();
            self.dirs
                .get(key)
                .map(|cs| cs.iter().map(OsString::from).collect())
                .ok_or_else(|| AppError::NotFound(path.to_path_buf()))
        }

        fn symlink_metadata(&self, path: &Path) -> Result<EntryStat, AppError> {
            let key = path.to_str().unwrap();
            let mode: u32 = if self.dirs.contains_key(key) {
                0o040_755
            } else {
                0o100_644
            };
            Ok(EntryStat {
                mode,
                ..EntryStat::default()
            })
        }

        fn metadata(&self, path: &Path) -> Result<EntryStat, AppError> {
            self.symlink_metadata(path)
        }

        fn is_local(&self, path: &str) -> bool {
            !self.remote.iter().any(|p| path.starts_with(p.as_str()))
        }
    }

    fn entry_set(store: &TreeStore) -> Vec<(String, bool)> {
        store
            .iter()
            .map(|e| (e.path().to_owned(), e.is_scanned()))
            .collect()
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        let vfs = FakeVfs::new(&[("/", &[])]);

        let mut store = TreeStore::new();
        store.insert("/usr");
        store.insert("/usr/bin");
        store.insert("/usr/local/share");
        store.insert("/etc");
        store.set_scanned("/usr");
        store.set_scanned("/usr/bin");

        store.save(&file, &vfs).unwrap();
        assert!(!store.is_dirty());

        let loaded = TreeStore::load(&file, &vfs, &SpecialDirs::default());
        assert_eq!(entry_set(&loaded), entry_set(&store));
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn test_saved_file_is_front_coded() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        let vfs = FakeVfs::new(&[]);

        let mut store = TreeStore::new();
        store.insert("/usr/bin");
        store.insert("/usr/lib");
        store.save(&file, &vfs).unwrap();

        let raw = fs::read_to_string(&file).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], TREE_SIGNATURE);
        assert_eq!(lines[1], "0:/usr");
        // "/usr/bin" shares 4 bytes with "/usr", "/usr/lib" shares 5 with
        // "/usr/bin".
        assert_eq!(lines[2], "0:4 /bin");
        assert_eq!(lines[3], "0:5 lib");
    }

    #[test]
    fn test_remote_paths_are_not_persisted() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        let vfs = FakeVfs::new(&[]).with_remote("/net");

        let mut store = TreeStore::new();
        store.insert("/home");
        store.insert("/net/host/share");
        store.save(&file, &vfs).unwrap();

        let loaded = TreeStore::load(&file, &vfs, &SpecialDirs::default());
        assert!(loaded.lookup("/home").is_some());
        assert!(loaded.lookup("/net/host/share").is_none());
        assert!(loaded.lookup("/net/host").is_none());
    }

    #[test]
    fn test_bad_signature_bootstraps_root() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        fs::write(&file, "some other program's file\n0:/junk\n").unwrap();

        let vfs = FakeVfs::new(&[("/", &["bin", "etc", "README"]), ("/bin", &[]), ("/etc", &[])]);
        let store = TreeStore::load(&file, &vfs, &SpecialDirs::default());

        assert!(store.lookup("/junk").is_none());
        assert!(store.lookup("/").is_some_and(|e| e.is_scanned()));
        assert!(store.lookup("/bin").is_some());
        assert!(store.lookup("/etc").is_some());
        // Plain files are not directories and never enter the tree.
        assert!(store.lookup("/README").is_none());
    }

    #[test]
    fn test_missing_file_bootstraps_root() {
        let tmp = TempDir::new().unwrap();
        let vfs = FakeVfs::new(&[("/", &["srv"]), ("/srv", &[])]);

        let store = TreeStore::load(&tmp.path().join("absent"), &vfs, &SpecialDirs::default());
        assert!(store.lookup("/srv").is_some());
        // A bootstrapped store has unsaved state.
        assert!(store.is_dirty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        fs::write(
            &file,
            format!(
                "{TREE_SIGNATURE}\n\
                 1:/good\n\
                 x:/bad-flag\n\
                 1frobnicate\n\
                 1:999 overlong-prefix\n\
                 1:not-absolute\n\
                 0:5 more\n"
            ),
        )
        .unwrap();

        let vfs = FakeVfs::new(&[]);
        let store = TreeStore::load(&file, &vfs, &SpecialDirs::default());

        // "/good" plus the front-coded "0:5 more" -> "/goodmore".
        assert!(store.lookup("/good").is_some());
        assert!(store.lookup("/goodmore").is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_escaped_characters_round_trip() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("tree.cache");
        let vfs = FakeVfs::new(&[]);

        let weird = "/strange\nname/with\\backslash";
        let mut store = TreeStore::new();
        store.insert(weird);
        store.save(&file, &vfs).unwrap();

        let raw = fs::read_to_string(&file).unwrap();
        // The embedded newline must not split the record.
        assert_eq!(raw.lines().count(), 1 + store.len());

        let loaded = TreeStore::load(&file, &vfs, &SpecialDirs::default());
        assert!(loaded.lookup(weird).is_some());
    }

    #[test]
    fn test_special_dirs_skip_bootstrap_enumeration() {
        let tmp = TempDir::new().unwrap();
        let vfs = FakeVfs::new(&[("/", &["nfs"]), ("/nfs", &["a", "b"])]);
        let special = SpecialDirs::new(vec!["/".into()]);

        let store = TreeStore::load(&tmp.path().join("absent"), &vfs, &special);

        // Root itself is special: marked scanned, children never enumerated.
        assert!(store.lookup("/").is_some_and(|e| e.is_scanned()));
        assert!(store.lookup("/nfs").is_none());
    }
}
