//! In-memory stores for exercising the repository without Postgres or a
//! filesystem.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::blob::{BlobError, BlobStore};
use crate::db::types::SortOrder;
use crate::db::{CloudEventMetadata, ColumnarStore, DbError, DbValue, InsertStatement, SelectQuery};

type Row = HashMap<String, DbValue>;

/// Columnar store keeping rows in insertion order.
#[derive(Default)]
pub struct MemoryColumnarStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    fail_inserts: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryColumnarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following insert fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, AtomicOrdering::SeqCst);
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.lock().await.get(table).map_or(0, Vec::len)
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }
}

fn row_matches(row: &Row, query: &SelectQuery) -> bool {
    query.predicates.iter().all(|predicate| {
        row.get(predicate.column())
            .is_some_and(|value| predicate.matches(value))
    })
}

fn compare_rows(a: &Row, b: &Row, column: &str) -> Ordering {
    match (a.get(column), b.get(column)) {
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl ColumnarStore for MemoryColumnarStore {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<CloudEventMetadata>, DbError> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);

        let tables = self.tables.lock().await;
        let Some(rows) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Row> = rows.iter().filter(|row| row_matches(row, query)).collect();
        if let Some((column, order)) = &query.order_by {
            matched.sort_by(|a, b| match order {
                SortOrder::Asc => compare_rows(a, b, column),
                SortOrder::Desc => compare_rows(b, a, column),
            });
        }
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        matched
            .into_iter()
            .map(CloudEventMetadata::from_columns)
            .collect()
    }

    async fn execute(&self, statement: &InsertStatement) -> Result<(), DbError> {
        if self.fail_inserts.load(AtomicOrdering::SeqCst) {
            return Err(DbError::Store(format!("insert into {} rejected", statement.table)));
        }
        if statement.columns.len() != statement.values.len() {
            return Err(DbError::Store(format!(
                "{} columns but {} values",
                statement.columns.len(),
                statement.values.len()
            )));
        }

        let row: Row = statement
            .columns
            .iter()
            .cloned()
            .zip(statement.values.iter().cloned())
            .collect();
        self.tables
            .lock()
            .await
            .entry(statement.table.clone())
            .or_default()
            .push(row);
        Ok(())
    }
}

/// Blob store counting every get and put it serves.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    fail_puts: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following put fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, AtomicOrdering::SeqCst);
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(AtomicOrdering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(AtomicOrdering::SeqCst)
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .await
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, BlobError> {
        self.gets.fetch_add(1, AtomicOrdering::SeqCst);
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), BlobError> {
        self.puts.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_puts.load(AtomicOrdering::SeqCst) {
            return Err(BlobError::Backend(format!("put {}/{} rejected", bucket, key)));
        }
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}
