use thiserror::Error;

use crate::blob::BlobError;
use crate::db::DbError;
use crate::index::IndexError;

#[derive(Debug, Error)]
pub enum RepoError {
    /// No row matched the search criteria.
    #[error("No records found: {0}")]
    NotFound(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Failed to query index table: {0}")]
    Query(#[from] DbError),

    #[error("Failed to store index row for {key}: {source}")]
    StoreRow {
        key: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to get object {key}: {source}")]
    GetObject {
        key: String,
        #[source]
        source: BlobError,
    },

    #[error("Failed to store object {key}: {source}")]
    PutObject {
        key: String,
        #[source]
        source: BlobError,
    },
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound(_))
    }
}
