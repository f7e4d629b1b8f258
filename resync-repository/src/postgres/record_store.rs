use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::interfaces::{RecordCursor, RecordStore, SaveHooks};
use resync_shared::{Record, RecordFilter};

/// A row of the records table.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    data: Json<Map<String, Value>>,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record::new(row.id, row.data.0)
    }
}

/// Record store backed by a Postgres table.
///
/// Natural cursor order is insertion order, tracked by a `seq` column, so that
/// saves during a sweep never reorder the cursor.
pub struct PgRecordStore {
    pool: PgPool,
    table: String,
    select_query: String,
    upsert_query: String,
    hooks: SaveHooks,
}

impl PgRecordStore {
    /// Connect to `url` and use `table` as the collection.
    pub async fn new(
        url: &str,
        table: &str,
        max_connections: u32,
        hooks: SaveHooks,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| StoreError::connection(e.to_string()))?;

        info!(table = %table, max_connections, "Connected to record store");
        Self::from_pool(pool, table, hooks)
    }

    /// Use an existing pool.
    pub fn from_pool(pool: PgPool, table: &str, hooks: SaveHooks) -> Result<Self, StoreError> {
        validate_table_name(table)?;

        Ok(Self {
            pool,
            table: table.to_string(),
            select_query: select_query(table),
            upsert_query: upsert_query(table),
            hooks,
        })
    }

    /// Create the records table if it does not exist.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let query = format!(
            r#"
CREATE TABLE IF NOT EXISTS {table} (
    seq BIGSERIAL,
    id UUID PRIMARY KEY,
    data JSONB NOT NULL DEFAULT '{{}}'::jsonb,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
            "#,
            table = self.table
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(e.to_string()))?;
        Ok(())
    }

    /// Insert a record without running hooks.
    pub async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        self.write(record).await
    }

    /// Remove every record.
    pub async fn clear(&self) -> Result<(), StoreError> {
        sqlx::query(&format!("DELETE FROM {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(e.to_string()))?;
        Ok(())
    }

    async fn write(&self, record: &Record) -> Result<(), StoreError> {
        sqlx::query(&self.upsert_query)
            .bind(record.id)
            .bind(Json(&record.fields))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::write(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    fn cursor<'a>(&'a self, filter: &'a RecordFilter) -> RecordCursor<'a> {
        // `@>` with an empty object matches every row.
        sqlx::query_as::<_, RecordRow>(&self.select_query)
            .bind(Json(filter.as_json()))
            .fetch(&self.pool)
            .map(|row| {
                row.map(Record::from)
                    .map_err(|e| StoreError::cursor(e.to_string()))
            })
            .boxed()
    }

    async fn save(&self, record: &Record) -> Result<(), StoreError> {
        self.hooks.run(record).await?;
        self.write(record).await?;

        debug!(record_id = %record.id, "Record saved");
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers are accepted.
fn validate_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && table.len() <= 63 {
        Ok(())
    } else {
        Err(StoreError::invalid_config(format!(
            "invalid table name: {:?}",
            table
        )))
    }
}

fn select_query(table: &str) -> String {
    format!(
        "SELECT id, data FROM {} WHERE data @> $1::jsonb ORDER BY seq",
        table
    )
}

fn upsert_query(table: &str) -> String {
    format!(
        r#"
INSERT INTO {table} (id, data)
VALUES ($1, $2)
ON CONFLICT (id) DO UPDATE
SET data = EXCLUDED.data, updated_at = NOW()
        "#,
        table = table
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("books").is_ok());
        assert!(validate_table_name("_books_2024").is_ok());

        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2books").is_err());
        assert!(validate_table_name("books; DROP TABLE users").is_err());
        assert!(validate_table_name("public.books").is_err());
    }

    #[test]
    fn test_queries_use_table_name() {
        assert_eq!(
            select_query("books"),
            "SELECT id, data FROM books WHERE data @> $1::jsonb ORDER BY seq"
        );
        assert!(upsert_query("books").contains("INSERT INTO books (id, data)"));
        assert!(upsert_query("books").contains("ON CONFLICT (id) DO UPDATE"));
    }

    #[test]
    fn test_row_into_record() {
        let id = Uuid::new_v4();
        let mut data = Map::new();
        data.insert("title".to_string(), Value::String("Dune".to_string()));

        let record: Record = RecordRow {
            id,
            data: Json(data),
        }
        .into();

        assert_eq!(record.id, id);
        assert_eq!(record.get("title"), Some(&Value::String("Dune".to_string())));
    }
}
