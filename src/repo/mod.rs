//! Repository over the `cloud_event` index table and the blob store holding
//! event payloads.
//!
//! A stored event is an object in the blob store, named by its index key, and
//! a row in the index table pointing at that key. Objects are always written
//! before rows, so every visible row has a retrievable object. A failed row
//! insert leaves its object orphaned; nothing is rolled back.

pub mod error;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error};

use crate::blob::{BlobStore, LocalBlobStore};
use crate::cloud_event::{derive_key, to_index, CloudEvent, CloudEventHeader};
use crate::db::schema::{insert_statement, COLUMNS, TABLE_NAME, TIMESTAMP_COLUMN};
use crate::db::{CloudEventMetadata, ColumnarStore, DbPool, IdentifierFormat, SelectQuery, SortOrder};
use crate::index::encode_index;
use crate::types::config::index::IndexConfig;

pub use error::RepoError;
pub use search::SearchOptions;

pub struct IndexRepository {
    columnar: Arc<dyn ColumnarStore>,
    blobs: Arc<dyn BlobStore>,
    bucket: String,
    identifier_format: IdentifierFormat,
}

impl IndexRepository {
    pub fn new(
        columnar: Arc<dyn ColumnarStore>,
        blobs: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            columnar,
            blobs,
            bucket: bucket.into(),
            identifier_format: IdentifierFormat::default(),
        }
    }

    pub fn with_identifier_format(mut self, format: IdentifierFormat) -> Self {
        self.identifier_format = format;
        self
    }

    /// Connect to Postgres and open the local blob store described by `config`.
    pub async fn from_config(config: &IndexConfig) -> anyhow::Result<Self> {
        let database_url = config.database.database_url()?;
        let pool = DbPool::new(&database_url, config.database.max_pool_size).await?;
        let blobs = LocalBlobStore::new(&config.blob_store.base_path).await?;

        Ok(Self::new(Arc::new(pool), Arc::new(blobs), config.blob_store.bucket.clone())
            .with_identifier_format(config.identifier_format))
    }

    fn select(&self, opts: &SearchOptions) -> SelectQuery {
        SelectQuery::new(TABLE_NAME, &COLUMNS).filter(opts.predicates(self.identifier_format))
    }

    /// Most recent row matching `opts`. Ordering options are ignored.
    pub async fn latest_index(&self, opts: &SearchOptions) -> Result<CloudEventMetadata, RepoError> {
        let query = self
            .select(opts)
            .order_by(TIMESTAMP_COLUMN, SortOrder::Desc)
            .limit(1);

        self.columnar
            .query(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("no events match {:?}", opts)))
    }

    /// Up to `limit` rows matching `opts`, newest first unless
    /// `opts.timestamp_asc` is set. An empty result is [`RepoError::NotFound`].
    pub async fn list_indexes(
        &self,
        limit: usize,
        opts: &SearchOptions,
    ) -> Result<Vec<CloudEventMetadata>, RepoError> {
        let order = if opts.timestamp_asc {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        };
        let query = self
            .select(opts)
            .order_by(TIMESTAMP_COLUMN, order)
            .limit(limit);

        let rows = self.columnar.query(&query).await?;
        if rows.is_empty() {
            return Err(RepoError::NotFound(format!("no events match {:?}", opts)));
        }
        Ok(rows)
    }

    /// Raw object stored under `key`.
    pub async fn get_object(&self, key: &str) -> Result<Bytes, RepoError> {
        self.blobs
            .get_object(&self.bucket, key)
            .await
            .map_err(|source| RepoError::GetObject {
                key: key.to_string(),
                source,
            })
    }

    /// Objects of `rows`, in the same order. Rows sharing an index key are
    /// fetched once.
    pub async fn fetch_objects(&self, rows: &[CloudEventMetadata]) -> Result<Vec<Bytes>, RepoError> {
        let mut fetched: HashMap<&str, Bytes> = HashMap::new();
        let mut objects = Vec::with_capacity(rows.len());

        for row in rows {
            let key = row.index_key.as_str();
            let data = match fetched.get(key) {
                Some(data) => data.clone(),
                None => {
                    let data = self.get_object(key).await?;
                    fetched.insert(key, data.clone());
                    data
                }
            };
            objects.push(data);
        }

        debug!(
            "Fetched {} objects for {} rows",
            fetched.len(),
            rows.len()
        );
        Ok(objects)
    }

    pub async fn latest_cloud_event(
        &self,
        opts: &SearchOptions,
    ) -> Result<CloudEvent<Bytes>, RepoError> {
        let row = self.latest_index(opts).await?;
        let data = self.get_object(&row.index_key).await?;
        Ok(CloudEvent::new(row.header, data))
    }

    pub async fn list_cloud_events(
        &self,
        limit: usize,
        opts: &SearchOptions,
    ) -> Result<Vec<CloudEvent<Bytes>>, RepoError> {
        let rows = self.list_indexes(limit, opts).await?;
        let objects = self.fetch_objects(&rows).await?;

        Ok(rows
            .into_iter()
            .zip(objects)
            .map(|(row, data)| CloudEvent::new(row.header, data))
            .collect())
    }

    /// Store an event whose header must convert to a valid index. Returns the
    /// index key.
    pub async fn store_object(
        &self,
        header: &CloudEventHeader,
        data: Bytes,
    ) -> Result<String, RepoError> {
        let key = encode_index(&to_index(header)?)?;
        self.store_object_with_key(header, &key, data).await
    }

    /// Store an event under a best-effort key, accepting malformed headers.
    pub async fn store_partial_object(
        &self,
        header: &CloudEventHeader,
        data: Bytes,
    ) -> Result<String, RepoError> {
        let key = derive_key(header);
        self.store_object_with_key(header, &key, data).await
    }

    /// Write `data` under `key`, then insert the row pointing at it.
    pub async fn store_object_with_key(
        &self,
        header: &CloudEventHeader,
        key: &str,
        data: Bytes,
    ) -> Result<String, RepoError> {
        let size = data.len();
        self.blobs
            .put_object(&self.bucket, key, data)
            .await
            .map_err(|source| RepoError::PutObject {
                key: key.to_string(),
                source,
            })?;

        let statement = insert_statement(header, key, self.identifier_format);
        if let Err(source) = self.columnar.execute(&statement).await {
            error!("Object {} stored but its index row failed: {}", key, source);
            return Err(RepoError::StoreRow {
                key: key.to_string(),
                source,
            });
        }

        debug!("Stored event {} ({} bytes) under {}", header.id, size, key);
        Ok(key.to_string())
    }
}
