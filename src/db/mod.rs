/// Database Module
///
/// This module handles all SQLite database operations including:
/// - Connection pool management (a single connection, WAL journal)
/// - Schema migrations
/// - Lookups used by the process pass to decide what still needs work
#[cfg(test)]
use crate::models::ProcessedMarker;
use crate::models::RawBlockRecord;
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file at `path`
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", path.display()))?;

        Ok(Self { pool })
    }

    /// Private in-memory database; the single connection is never recycled
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true).foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("Failed to run database migrations")?;

        tracing::debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.context("Database connection test failed")?;

        Ok(())
    }

    /// Raw block bytes stored at `idx`, if fetched
    pub async fn get_raw_block(&self, idx: u64) -> Result<Option<RawBlockRecord>> {
        let record = sqlx::query_as::<_, RawBlockRecord>("SELECT idx, bytes FROM raw_blocks_p WHERE idx = ?")
            .bind(idx as i64)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read raw block {}", idx))?;

        Ok(record)
    }

    /// An index counts as processed when it has a marker or any transaction row
    pub async fn is_processed(&self, idx: u64) -> Result<bool> {
        let processed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM processed_p WHERE idx = ?1) OR EXISTS(SELECT 1 FROM txs_p WHERE idx = ?1)",
        )
        .bind(idx as i64)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to check processed state of {}", idx))?;

        Ok(processed)
    }

    #[cfg(test)]
    pub async fn get_processed_marker(&self, idx: u64) -> Result<Option<ProcessedMarker>> {
        let marker = sqlx::query_as::<_, ProcessedMarker>(
            "SELECT idx, tx_count, processed_at FROM processed_p WHERE idx = ?",
        )
        .bind(idx as i64)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read processed marker {}", idx))?;

        Ok(marker)
    }

    pub async fn count_raw_blocks(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw_blocks_p")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count raw blocks")?;

        Ok(count)
    }

    pub async fn count_transactions(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM txs_p")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_file_database_and_migrate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slurp.db");

        let db = Database::new(&path).await.unwrap();
        db.migrate().await.unwrap();
        db.test_connection().await.unwrap();
        assert!(path.exists());

        // Migrations are idempotent across reopen
        drop(db);
        let db = Database::new(&path).await.unwrap();
        db.migrate().await.unwrap();
        assert_eq!(db.count_raw_blocks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_processed_by_marker_or_row() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.is_processed(1).await.unwrap());
        assert!(db.get_raw_block(1).await.unwrap().is_none());

        sqlx::query("INSERT INTO processed_p (idx, tx_count) VALUES (1, 0)").execute(db.pool()).await.unwrap();
        assert!(db.is_processed(1).await.unwrap());
        let marker = db.get_processed_marker(1).await.unwrap().unwrap();
        assert_eq!(marker.tx_count, 0);

        // Rows written without a marker still count
        sqlx::query(
            "INSERT INTO txs_p (idx, id, height, block_id, type_id, ts, unsigned_tx, unsigned_bytes, sig_bytes, \
             signer_addr_p, signer_addr_c) VALUES (2, 'tx', 1, 'blk', 17, 0, '{\"networkID\":1,\"memo\":\"0x\"}', '', '', '', '')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        assert!(db.is_processed(2).await.unwrap());
        assert!(db.get_processed_marker(2).await.unwrap().is_none());

        let (network_id, memo) = sqlx::query_as::<_, (i64, String)>("SELECT network_id, memo FROM txs_p WHERE idx = 2")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(network_id, 1);
        assert_eq!(memo, "0x");
    }
}
