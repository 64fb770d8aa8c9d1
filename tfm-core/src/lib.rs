pub mod error;

pub mod config;

pub mod logging;

pub mod fs {
    pub mod collate;
    pub use collate::{common_prefix_len, path_cmp};

    pub mod vfs;
    pub use vfs::{LocalFs, Vfs};

    pub mod dir_entry;
    pub use dir_entry::{DirEntry, EntryStat};

    pub mod tree_entry;
    pub use tree_entry::TreeEntry;

    pub mod tree_store;
    pub use tree_store::{ListenerId, RemovalListener, TreeStore};

    pub mod tree_file;

    pub mod listing;
    pub use listing::{
        DirList, ListingEngine, ListingOptions, Panel, PanelStatus, SortKey, SortOptions,
    };
}

pub use error::AppError;

pub use config::{Config, ListingConfig, SpecialDirs, TreeConfig};

pub use fs::dir_entry::{DirEntry, EntryStat};
pub use fs::listing::{DirList, ListingEngine, ListingOptions, SortKey, SortOptions};
pub use fs::tree_store::TreeStore;
pub use fs::vfs::{LocalFs, Vfs};
