use async_trait::async_trait;

use super::error::DbError;
use super::schema::CloudEventMetadata;
use super::types::{InsertStatement, SelectQuery};

/// Query/execute capability of the columnar store holding the
/// `cloud_event` table.
///
/// Implementations must be safe to share between concurrent callers; the
/// repository adds no locking of its own.
#[async_trait]
pub trait ColumnarStore: Send + Sync {
    /// Run a SELECT and decode the resulting rows.
    async fn query(&self, query: &SelectQuery) -> Result<Vec<CloudEventMetadata>, DbError>;

    /// Run a single INSERT.
    async fn execute(&self, statement: &InsertStatement) -> Result<(), DbError>;
}
