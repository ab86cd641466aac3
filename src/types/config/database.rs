use std::env;

use anyhow::Context;
use serde::Deserialize;

use crate::db::pool::DEFAULT_MAX_POOL_SIZE;

/// Connection settings for the columnar index table.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Environment variable holding the PostgreSQL connection string.
    #[serde(default = "default_url_env_var")]
    pub url_env_var: String,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,
}

fn default_url_env_var() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_pool_size() -> usize {
    DEFAULT_MAX_POOL_SIZE
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env_var: default_url_env_var(),
            max_pool_size: default_max_pool_size(),
        }
    }
}

impl DatabaseConfig {
    /// Read the connection string, loading `.env` if the variable is not set.
    pub fn database_url(&self) -> anyhow::Result<String> {
        if let Ok(url) = env::var(&self.url_env_var) {
            return Ok(url);
        }

        dotenvy::dotenv().with_context(|| {
            format!(
                "Missing env var {} and failed to load .env file",
                self.url_env_var
            )
        })?;

        env::var(&self.url_env_var).with_context(|| {
            format!(
                "Missing required env var after loading .env: {}",
                self.url_env_var
            )
        })
    }
}
