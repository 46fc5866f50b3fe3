//! `ClickHouse` writer functionality for ledgerscope
//! Handles database initialization, migrations, and row insertion

use clickhouse::{Client, Row};
use derive_more::Debug;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::{
    models::CursorRow,
    schema::{CURSOR_TABLE, TABLE_SCHEMAS, TABLES, TableSchema},
};

#[derive(Row, Serialize, Deserialize)]
struct MaxBlock {
    block_number: Option<u64>,
}

/// `ClickHouse` writer client for ledgerscope (row insertion and migrations)
#[derive(Clone, Debug)]
pub struct ClickhouseWriter {
    /// Base client
    #[debug(skip)]
    base: Client,
    /// Database name
    db_name: String,
}

impl ClickhouseWriter {
    /// Create a new `ClickHouse` writer client
    pub fn new(url: Url, db_name: String, username: String, password: String) -> Result<Self> {
        let client = Client::default()
            .with_url(url)
            .with_database(db_name.clone())
            .with_user(username)
            .with_password(password);

        Ok(Self { base: client, db_name })
    }

    /// Create a table with the given schema
    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let query = format!(
            "CREATE TABLE IF NOT EXISTS {}.{} (
                {}
            ) ENGINE = ReplacingMergeTree(inserted_at)
            ORDER BY ({})",
            self.db_name, schema.name, schema.columns, schema.order_by
        );

        self.base
            .query(&query)
            .execute()
            .await
            .wrap_err_with(|| format!("Failed to create {} table", schema.name))
    }

    /// Drop a table if it exists
    async fn drop_table(&self, table_name: &str) -> Result<()> {
        self.base
            .query(&format!("DROP TABLE IF EXISTS {}.{}", self.db_name, table_name))
            .execute()
            .await
            .wrap_err_with(|| format!("Failed to drop {table_name} table"))
    }

    /// Create the database and every table, dropping the tables first when `reset` is set
    pub async fn init_db(&self, reset: bool) -> Result<()> {
        self.base
            .query(&format!("CREATE DATABASE IF NOT EXISTS {}", self.db_name))
            .execute()
            .await
            .wrap_err_with(|| format!("Failed to create database {}", self.db_name))?;

        if reset {
            for table in TABLES {
                self.drop_table(table).await?;
            }
            info!(db_name = %self.db_name, "Database reset complete");
        }

        self.init_schema().await
    }

    /// Initialize schema
    pub async fn init_schema(&self) -> Result<()> {
        for schema in TABLE_SCHEMAS {
            self.create_table(schema).await?;
        }
        info!(db_name = %self.db_name, tables = TABLE_SCHEMAS.len(), "Schema ready");
        Ok(())
    }

    /// Insert `rows` into `table` with a single INSERT. Empty input is a no-op.
    pub async fn insert_rows<T>(&self, table: &str, rows: &[T]) -> Result<()>
    where
        T: Row + Serialize,
    {
        if rows.is_empty() {
            return Ok(());
        }

        let client = self.base.clone().with_database(&self.db_name);
        let mut insert = client.insert(table)?;
        for row in rows {
            insert.write(row).await.wrap_err_with(|| format!("Failed to write {table} row"))?;
        }
        insert.end().await.wrap_err_with(|| format!("Failed to insert into {table}"))?;

        debug!(table, rows = rows.len(), "Inserted rows");
        Ok(())
    }

    /// Record `block_number` as committed under the cursor `name`
    pub async fn record_cursor(&self, name: &str, block_number: u64) -> Result<()> {
        let row = CursorRow { name: name.to_owned(), block_number };
        self.insert_rows(CURSOR_TABLE, std::slice::from_ref(&row)).await
    }

    /// Highest block committed under the cursor `name`, if any
    pub async fn last_committed_block(&self, name: &str) -> Result<Option<u64>> {
        let query = format!(
            "SELECT maxOrNull(block_number) AS block_number FROM {}.{} WHERE name = ?",
            self.db_name, CURSOR_TABLE
        );

        let rows = self
            .base
            .query(&query)
            .bind(name)
            .fetch_all::<MaxBlock>()
            .await
            .wrap_err("fetching scrape cursor failed")?;

        Ok(rows.into_iter().next().and_then(|row| row.block_number))
    }
}
