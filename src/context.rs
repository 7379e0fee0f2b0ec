//! Shared engine context.
//!
//! Built once from an [`EngineConfig`] and handed by reference to builders,
//! indexers and searchers. Nothing in the crate reads configuration from
//! anywhere else.

use std::path::Path;
use std::sync::Arc;

use crate::config::{BuildConfig, DatabaseConfig, EngineConfig, VarIndexConfig};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Context {
    config: Arc<EngineConfig>,
}

impl Context {
    /// Validate `config` and wrap it.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::new(EngineConfig::from_json_file(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.config.database
    }

    pub fn build(&self) -> &BuildConfig {
        &self.config.build
    }

    pub fn var_index(&self) -> &VarIndexConfig {
        &self.config.var_index
    }

    /// Directory of the database.
    pub fn db_path(&self) -> &Path {
        &self.config.database.path
    }
}
