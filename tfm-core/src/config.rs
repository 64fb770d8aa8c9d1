//! src/config.rs
//! ============================================================================
//! # Config: user-editable settings for the navigation core
//!
//! Loads and saves settings as TOML from the proper cross-platform config path
//! using the [`directories`](https://docs.rs/directories) crate.
//!
//! - XDG-compliant config discovery and writing (Linux, macOS, Windows)
//! - Robust defaulting if no config file exists
//! - Carries the listing visibility switches, sort defaults, the special-dirs
//!   prefix list and the tree cache file location

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;

const CONFIG_FILE: &str = "config.toml";
const TREE_FILE: &str = "tree.cache";

/// Visibility and sort defaults for panel listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Show entries whose name starts with a dot.
    pub show_hidden: bool,

    /// Show entries whose name ends with `~`.
    pub show_backups: bool,

    /// Sort directories and files together instead of directories first.
    pub mix_all_files: bool,

    /// Compare names byte-wise instead of case-folded.
    pub case_sensitive: bool,

    /// Within the file block, sort executables before plain files.
    pub exec_first: bool,

    /// Invoke the busy-indicator callback every this many scanned entries.
    pub progress_every: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            show_hidden: true,
            show_backups: true,
            mix_all_files: false,
            case_sensitive: true,
            exec_first: false,
            progress_every: 32,
        }
    }
}

/// Tree-store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Path prefixes (e.g. slow automount points) whose subtrees are never
    /// enumerated eagerly during a rescan.
    pub special_dirs: Vec<String>,

    /// Override for the tree cache file location.
    pub cache_file: Option<PathBuf>,
}

/// Main configuration struct for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listing: ListingConfig,
    pub tree: TreeConfig,
}

impl Config {
    /// Load the config from the platform config dir, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, AppError> {
        let path: PathBuf = Self::config_file_path();

        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw: String = fs::read_to_string(&path).map_err(|e| AppError::ConfigIo {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Persist the config, creating the config dir if needed.
    pub fn save(&self) -> Result<(), AppError> {
        let path: PathBuf = Self::config_file_path();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| AppError::ConfigIo {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let raw: String =
            toml::to_string_pretty(self).map_err(|e| AppError::Other(e.to_string()))?;

        fs::write(&path, raw).map_err(|e| AppError::ConfigIo {
            path: path.clone(),
            source: e,
        })?;

        info!("Saved config to {:?}", path);
        Ok(())
    }

    #[must_use]
    pub fn config_file_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Location of the persisted tree store.
    #[must_use]
    pub fn tree_file_path(&self) -> PathBuf {
        if let Some(path) = &self.tree.cache_file {
            return path.clone();
        }

        Self::project_dirs()
            .map(|d| d.data_dir().join(TREE_FILE))
            .unwrap_or_else(|| PathBuf::from(TREE_FILE))
    }

    #[must_use]
    pub fn special_dirs(&self) -> SpecialDirs {
        SpecialDirs::new(self.tree.special_dirs.clone())
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "tfm")
    }
}

/// Prefix predicate for directories whose children are expensive to
/// enumerate (slow mounts). A rescan of a matching path marks it `scanned`
/// without reading its children.
#[derive(Debug, Clone, Default)]
pub struct SpecialDirs {
    prefixes: Vec<String>,
}

impl SpecialDirs {
    #[must_use]
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    #[must_use]
    pub fn matches_path(&self, path: &Path) -> bool {
        path.to_str().is_some_and(|s| self.matches(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listing_config() {
        let cfg = ListingConfig::default();
        assert!(cfg.show_hidden);
        assert!(cfg.show_backups);
        assert!(!cfg.mix_all_files);
        assert_eq!(cfg.progress_every, 32);
    }

    #[test]
    fn test_special_dirs_prefix_match() {
        let special = SpecialDirs::new(vec!["/net".into(), "/mnt/slow".into()]);
        assert!(special.matches("/net"));
        assert!(special.matches("/net/host/share"));
        assert!(special.matches("/mnt/slow/backup"));
        assert!(!special.matches("/mnt"));
        assert!(!special.matches("/home"));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.listing.show_hidden = false;
        cfg.tree.special_dirs = vec!["/net".into()];

        let raw = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();

        assert!(!back.listing.show_hidden);
        assert_eq!(back.tree.special_dirs, vec!["/net".to_string()]);
    }
}
