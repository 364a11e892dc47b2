//! Store-scoped configuration loaded from `<root>/config.toml`.
//!
//! A missing file is not an error: every section has defaults. Unknown keys are
//! rejected so a typo never silently falls back to a default.

use crate::core::error::QualityError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the store root when `--root` is not given.
pub const ROOT_ENV: &str = "QUALITYGUARD_HOME";
/// Store directory used when neither `--root` nor `QUALITYGUARD_HOME` is set.
pub const DEFAULT_ROOT_DIR: &str = ".qualityguard";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    pub log: LogConfig,
    pub password: PasswordConfig,
    pub records: RecordsConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `QUALITYGUARD_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP baseline for Argon2id).
        Self {
            min_length: 8,
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RecordsConfig {
    /// Service level applied when a new record omits one.
    pub default_service_level: String,
    /// When false, any authenticated actor may delete a PENDING_FEEDBACK record.
    pub restrict_delete_to_analyst: bool,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            default_service_level: "E-Care Movil".to_string(),
            restrict_delete_to_analyst: false,
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(schemas::CONFIG_FILE_NAME)
}

impl QualityConfig {
    pub fn load(root: &Path) -> Result<Self, QualityError> {
        let path = config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: QualityConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QualityError> {
        if self.password.min_length == 0 {
            return Err(QualityError::Config(
                "password.min_length must be at least 1".to_string(),
            ));
        }
        if self.password.argon2_iterations == 0 || self.password.argon2_parallelism == 0 {
            return Err(QualityError::Config(
                "argon2 iterations and parallelism must be at least 1".to_string(),
            ));
        }
        if self.records.default_service_level.trim().is_empty() {
            return Err(QualityError::Config(
                "records.default_service_level must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Write this config to `<root>/config.toml`, refusing to clobber unless `force`.
    pub fn save(&self, root: &Path, force: bool) -> Result<PathBuf, QualityError> {
        let path = config_path(root);
        if path.exists() && !force {
            return Err(QualityError::Conflict(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QualityError::Config(e.to_string()))?;
        fs::create_dir_all(root)?;
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// Resolve the store root: explicit flag, then `QUALITYGUARD_HOME`, then `./.qualityguard`.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf, QualityError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(v) = std::env::var(ROOT_ENV) {
        if !v.trim().is_empty() {
            return Ok(PathBuf::from(v));
        }
    }
    Ok(std::env::current_dir()?.join(DEFAULT_ROOT_DIR))
}
