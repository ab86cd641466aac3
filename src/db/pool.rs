use std::collections::HashMap;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use super::error::DbError;
use super::schema::{CloudEventMetadata, TIMESTAMP_COLUMN};
use super::store::ColumnarStore;
use super::types::{DbValue, InsertStatement, Predicate, SelectQuery};

pub const DEFAULT_MAX_POOL_SIZE: usize = 16;

/// Postgres-backed columnar store.
pub struct DbPool {
    pool: Pool,
}

impl DbPool {
    pub async fn new(database_url: &str, max_size: usize) -> Result<Self, DbError> {
        let config = database_url
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbError::InvalidConnectionString(e.to_string()))?;

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(config, NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(max_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(DbError::BuildError)?;

        let _conn = pool.get().await?;
        tracing::info!("Database connection pool created successfully");

        Ok(Self { pool })
    }
}

#[async_trait]
impl ColumnarStore for DbPool {
    async fn query(&self, query: &SelectQuery) -> Result<Vec<CloudEventMetadata>, DbError> {
        let (sql, params) = build_select_sql(query);
        let params_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let client = self.pool.get().await?;
        let rows = match client.query(&sql, &params_refs[..]).await {
            Ok(rows) => rows,
            Err(e) => {
                let db_err: DbError = e.into();
                tracing::error!("SQL query failed\n  SQL: {}\n  Error: {}", sql, db_err);
                return Err(db_err);
            }
        };

        rows.iter()
            .map(|row| {
                let mut columns = HashMap::with_capacity(query.columns.len());
                for column in &query.columns {
                    let value = if column == TIMESTAMP_COLUMN {
                        DbValue::DateTime(row.try_get::<_, DateTime<Utc>>(column.as_str())?)
                    } else {
                        DbValue::Text(row.try_get::<_, String>(column.as_str())?)
                    };
                    columns.insert(column.clone(), value);
                }
                CloudEventMetadata::from_columns(&columns)
            })
            .collect()
    }

    async fn execute(&self, statement: &InsertStatement) -> Result<(), DbError> {
        let (sql, params) = build_insert_sql(statement);
        let params_refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let client = self.pool.get().await?;
        if let Err(e) = client.execute(&sql, &params_refs[..]).await {
            let db_err: DbError = e.into();
            tracing::error!("SQL execution failed\n  SQL: {}\n  Error: {}", sql, db_err);
            return Err(db_err);
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
enum SqlParam {
    Text(String),
    DateTime(DateTime<Utc>),
}

impl ToSql for SqlParam {
    fn to_sql(
        &self,
        ty: &tokio_postgres::types::Type,
        out: &mut BytesMut,
    ) -> Result<tokio_postgres::types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlParam::Text(v) => v.to_sql(ty, out),
            SqlParam::DateTime(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &tokio_postgres::types::Type) -> bool {
        <String as ToSql>::accepts(ty) || <DateTime<Utc> as ToSql>::accepts(ty)
    }

    tokio_postgres::types::to_sql_checked!();
}

fn convert_db_value(value: &DbValue) -> SqlParam {
    match value {
        DbValue::Text(v) => SqlParam::Text(v.clone()),
        DbValue::DateTime(v) => SqlParam::DateTime(*v),
    }
}

/// Wrap a column name in double quotes to handle reserved keywords.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn quote_cols(columns: &[String]) -> String {
    columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
}

fn build_insert_sql(statement: &InsertStatement) -> (String, Vec<SqlParam>) {
    let cols = quote_cols(&statement.columns);
    let placeholders = (1..=statement.values.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        statement.table, cols, placeholders
    );
    let params = statement.values.iter().map(convert_db_value).collect();

    (sql, params)
}

fn build_select_sql(query: &SelectQuery) -> (String, Vec<SqlParam>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM {}", quote_cols(&query.columns), query.table);

    if !query.predicates.is_empty() {
        let conditions: Vec<String> = query
            .predicates
            .iter()
            .map(|predicate| build_predicate_sql(predicate, &mut params))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if let Some((column, order)) = &query.order_by {
        sql.push_str(&format!(" ORDER BY {} {}", quote_ident(column), order.as_sql()));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    (sql, params)
}

fn build_predicate_sql(predicate: &Predicate, params: &mut Vec<SqlParam>) -> String {
    let (op, value) = match predicate {
        Predicate::Eq(_, value) => ("=", value),
        Predicate::Gt(_, value) => (">", value),
        Predicate::Lt(_, value) => ("<", value),
    };
    params.push(convert_db_value(value));
    format!("{} {} ${}", quote_ident(predicate.column()), op, params.len())
}
