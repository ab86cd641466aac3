pub mod error;
pub mod pool;
pub mod schema;
pub mod store;
pub mod types;

pub use error::DbError;
pub use pool::DbPool;
pub use schema::{CloudEventMetadata, IdentifierFormat};
pub use store::ColumnarStore;
pub use types::{DbValue, InsertStatement, Predicate, SelectQuery, SortOrder};
