use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Pool error: {0}")]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("{}", format_pg_error(.0))]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Build error: {0}")]
    BuildError(#[from] deadpool_postgres::BuildError),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Failed to decode row: {0}")]
    RowDecode(String),

    #[error("Store error: {0}")]
    Store(String),
}

fn format_pg_error(e: &tokio_postgres::Error) -> String {
    if let Some(db_err) = e.as_db_error() {
        let mut msg = format!(
            "PostgreSQL error [{}]: {}",
            db_err.code().code(),
            db_err.message()
        );
        if let Some(detail) = db_err.detail() {
            msg.push_str(&format!("\n  Detail: {}", detail));
        }
        if let Some(hint) = db_err.hint() {
            msg.push_str(&format!("\n  Hint: {}", hint));
        }
        if let Some(column) = db_err.column() {
            msg.push_str(&format!("\n  Column: {}", column));
        }
        msg
    } else {
        format!("PostgreSQL error: {}", e)
    }
}
