//! Engine configuration.
//!
//! All settings live in plain serde structs with sensible defaults, so a
//! configuration file only has to name what it changes. [`EngineConfig`]
//! bundles them and is what a [`Context`](crate::context::Context) is built
//! from.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlumeError, Result};

/// Sizing of one on-disk database generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Directory holding every file of the database.
    pub path: PathBuf,
    /// Upper bound on internal ids.
    pub max_id: u32,
    /// Length in bytes of the fixed per-document value.
    pub value_size: u32,
    /// Term occurrences an in-memory transform absorbs before it spills.
    pub transform_max_term_count: usize,
    /// Cap on one physical posting blob file.
    pub max_index_file_size: u32,
    /// Cap on one physical document data blob file.
    pub max_data_file_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("plume_db"),
            max_id: 1_000_000,
            value_size: 8,
            transform_max_term_count: 20_000_000,
            max_index_file_size: 1024 * 1024 * 1024,
            max_data_file_size: 1024 * 1024 * 1024,
        }
    }
}

/// Static build pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parse worker threads; `0` means one per CPU.
    pub parse_threads: usize,
    /// Capacity of the work and write queues; `0` means twice the workers.
    pub write_queue_len: usize,
}

impl BuildConfig {
    pub fn effective_parse_threads(&self) -> usize {
        if self.parse_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.parse_threads
        }
    }

    pub fn effective_write_queue_len(&self) -> usize {
        if self.write_queue_len == 0 {
            self.effective_parse_threads() * 2
        } else {
            self.write_queue_len
        }
    }
}

/// Dynamic index settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarIndexConfig {
    /// Minimum time between two compactions started by `sync`.
    #[serde(with = "duration_secs")]
    pub min_sync_interval: Duration,
    /// How often a refresher calls `sync`.
    #[serde(with = "duration_secs")]
    pub refresh_interval: Duration,
    /// Cap on one physical posting blob file of a compacted slot.
    pub max_index_file_size: u32,
}

impl Default for VarIndexConfig {
    fn default() -> Self {
        Self {
            min_sync_interval: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            max_index_file_size: 1024 * 1024 * 1024,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database: DatabaseConfig,
    pub build: BuildConfig,
    pub var_index: VarIndexConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Reject settings the storage layer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        if db.path.as_os_str().is_empty() {
            return Err(PlumeError::invalid_config("database.path is empty"));
        }
        if db.max_id < 2 {
            return Err(PlumeError::invalid_config(format!(
                "database.max_id must be at least 2, got {}",
                db.max_id
            )));
        }
        if db.value_size == 0 {
            return Err(PlumeError::invalid_config("database.value_size must be non-zero"));
        }
        if db.transform_max_term_count == 0 {
            return Err(PlumeError::invalid_config(
                "database.transform_max_term_count must be non-zero",
            ));
        }
        if db.max_index_file_size == 0 || db.max_data_file_size == 0 {
            return Err(PlumeError::invalid_config(
                "database file size caps must be non-zero",
            ));
        }
        if self.var_index.max_index_file_size == 0 {
            return Err(PlumeError::invalid_config(
                "var_index.max_index_file_size must be non-zero",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database.path = path.into();
        self
    }

    pub fn max_id(mut self, max_id: u32) -> Self {
        self.config.database.max_id = max_id;
        self
    }

    pub fn value_size(mut self, value_size: u32) -> Self {
        self.config.database.value_size = value_size;
        self
    }

    pub fn transform_max_term_count(mut self, count: usize) -> Self {
        self.config.database.transform_max_term_count = count;
        self
    }

    pub fn max_index_file_size(mut self, size: u32) -> Self {
        self.config.database.max_index_file_size = size;
        self
    }

    pub fn max_data_file_size(mut self, size: u32) -> Self {
        self.config.database.max_data_file_size = size;
        self
    }

    pub fn parse_threads(mut self, threads: usize) -> Self {
        self.config.build.parse_threads = threads;
        self
    }

    pub fn write_queue_len(mut self, len: usize) -> Self {
        self.config.build.write_queue_len = len;
        self
    }

    pub fn min_sync_interval(mut self, interval: Duration) -> Self {
        self.config.var_index.min_sync_interval = interval;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.var_index.refresh_interval = interval;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
