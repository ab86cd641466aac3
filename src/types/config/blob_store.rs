use std::path::PathBuf;

use serde::Deserialize;

/// Where event payloads are written.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreConfig {
    /// Root directory of the local blob store.
    pub base_path: PathBuf,

    /// Bucket every object of this repository lives in.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_bucket() -> String {
    "cloud-events".to_string()
}
