//! Store handle for a QualityGuard state directory.
//!
//! A Store is the root directory holding `quality.db`, the JSONL audit logs and
//! `config.toml`. Every subsystem function takes a `&Store` and derives its paths from it.

use crate::core::config::QualityConfig;
use crate::core::error::QualityError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute or caller-relative path to the store root directory
    pub root: PathBuf,
    pub config: QualityConfig,
}

impl Store {
    /// Create the root if needed, load its config and bring every subsystem schema up to date.
    pub fn open(root: &Path) -> Result<Self, QualityError> {
        fs::create_dir_all(root)?;
        let config = QualityConfig::load(root)?;
        crate::subsystems::initialize_all_dbs(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    /// Open with an explicit config instead of reading `config.toml`.
    pub fn open_with_config(root: &Path, config: QualityConfig) -> Result<Self, QualityError> {
        config.validate()?;
        fs::create_dir_all(root)?;
        crate::subsystems::initialize_all_dbs(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }
}
