use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::db::IdentifierFormat;
use crate::types::config::blob_store::BlobStoreConfig;
use crate::types::config::database::DatabaseConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    pub blob_store: BlobStoreConfig,

    /// How subject, producer and source are stored in the index table.
    #[serde(default)]
    pub identifier_format: IdentifierFormat,
}

impl IndexConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: IndexConfig = serde_json::from_str(content)?;
        anyhow::ensure!(
            !config.blob_store.bucket.is_empty(),
            "blob_store.bucket must not be empty"
        );
        anyhow::ensure!(
            config.database.max_pool_size > 0,
            "database.max_pool_size must be positive"
        );
        Ok(config)
    }
}
