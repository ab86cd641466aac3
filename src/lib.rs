//! Fixed-layout index keys for cloud events and a repository that stores and
//! retrieves events through a columnar index table and a blob store.
//!
//! The key layout is described on [`index::encode_index`]. Keys sort
//! lexicographically with the most recent date first, so they double as
//! blob-store object names.

pub mod blob;
pub mod cloud_event;
pub mod db;
pub mod index;
pub mod repo;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use cloud_event::{derive_key, CloudEvent, CloudEventHeader};
pub use index::{decode_index, encode_index, Index, IndexError, NftDid, Source, Subject};
pub use repo::{IndexRepository, RepoError, SearchOptions};
