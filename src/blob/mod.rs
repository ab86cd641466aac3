//! Object storage for event payloads, addressed by index key.

pub mod error;
pub mod local;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::BlobError;
pub use local::LocalBlobStore;

/// Get/put capability of a blob store.
///
/// Bucket lifecycle, credentials and retries are the backend's concern.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobError>;

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), BlobError>;
}
