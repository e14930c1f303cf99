//! Core configuration, loaded from TOML.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"
//! path = "dental.db"
//!
//! [attachments]
//! max_bytes = 5242880
//!
//! [dashboard]
//! top_patients = 10
//! ```
//!
//! Every section is optional; an empty file gives an in-memory store with the
//! default limits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::store::{MemoryStore, SqliteStore, Store, StoreResult};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend holds the collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file, required for the sqlite backend
    pub path: Option<PathBuf>,
    /// Total size cap for the memory backend
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Largest accepted upload, per file
    pub max_bytes: u64,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Length of the top-patients list
    pub top_patients: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { top_patients: 10 }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub attachments: AttachmentConfig,
    pub dashboard: DashboardConfig,
}

impl CoreConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            backend = ?config.storage.backend,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Configuration for a SQLite file at `path`, defaults elsewhere.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Sqlite,
                path: Some(path.into()),
                quota_bytes: None,
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Sqlite && self.storage.path.is_none() {
            return Err(ConfigError::Invalid(
                "storage.path is required for the sqlite backend".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.storage.quota_bytes.is_some() {
            return Err(ConfigError::Invalid(
                "storage.quota_bytes only applies to the memory backend".into(),
            ));
        }
        if self.attachments.max_bytes == 0 {
            return Err(ConfigError::Invalid("attachments.max_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Open the configured backend.
    pub fn open_store(&self) -> StoreResult<Arc<dyn Store>> {
        let store: Arc<dyn Store> = match (self.storage.backend, &self.storage.path) {
            (StorageBackend::Sqlite, Some(path)) => Arc::new(SqliteStore::open(path)?),
            // validate() rejects a sqlite backend without a path
            (StorageBackend::Sqlite, None) => Arc::new(SqliteStore::open_in_memory()?),
            (StorageBackend::Memory, _) => match self.storage.quota_bytes {
                Some(quota) => Arc::new(MemoryStore::with_quota(quota)),
                None => Arc::new(MemoryStore::new()),
            },
        };
        Ok(store)
    }
}
