use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key {0:?}")]
    InvalidKey(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
