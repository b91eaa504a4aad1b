/// Load Module
///
/// Handles storing data into the SQLite database.
use crate::models::TransactionRecord;
use anyhow::{Context, Result};
use sqlx::SqlitePool;

/// Insert or replace the raw bytes fetched for `idx`
///
/// Uses UPSERT logic (ON CONFLICT DO UPDATE) so a re-fetch overwrites with the
/// same bytes instead of failing.
pub async fn insert_raw_block(pool: &SqlitePool, idx: u64, bytes: &[u8]) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO raw_blocks_p (idx, bytes)
        VALUES (?, ?)
        ON CONFLICT (idx)
        DO UPDATE SET bytes = excluded.bytes
        "#,
    )
    .bind(idx as i64)
    .bind(bytes)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to store raw block {}", idx))?;

    tracing::trace!("Stored raw block {} ({} bytes)", idx, bytes.len());
    Ok(())
}

/// Write all transaction rows of one index plus its processed marker
///
/// Runs inside a single database transaction: either the whole index is
/// committed or nothing is. Returns the number of rows inserted.
pub async fn insert_block_transactions(pool: &SqlitePool, idx: u64, records: &[TransactionRecord]) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let mut inserted = 0;
    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO txs_p (
                idx,
                id,
                height,
                block_id,
                type_id,
                ts,
                unsigned_tx,
                unsigned_bytes,
                sig_bytes,
                signer_addr_p,
                signer_addr_c
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (idx, id) DO NOTHING
            "#,
        )
        .bind(record.idx as i64)
        .bind(&record.tx_id)
        .bind(record.height as i64)
        .bind(&record.block_id)
        .bind(record.type_id as i64)
        .bind(record.timestamp)
        .bind(&record.unsigned_tx)
        .bind(&record.unsigned_bytes)
        .bind(&record.sig_bytes)
        .bind(&record.signer_addr_p)
        .bind(&record.signer_addr_c)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert transaction {} at index {}", record.tx_id, idx))?;

        inserted += result.rows_affected() as usize;
    }

    sqlx::query("INSERT INTO processed_p (idx, tx_count) VALUES (?, ?) ON CONFLICT (idx) DO NOTHING")
        .bind(idx as i64)
        .bind(inserted as i64)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to mark index {} processed", idx))?;

    tx.commit().await?;

    tracing::debug!("Inserted {} transactions for index {}", inserted, idx);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn record(idx: u64, tx_id: &str) -> TransactionRecord {
        TransactionRecord {
            idx,
            tx_id: tx_id.to_string(),
            height: idx,
            block_id: "blk".to_string(),
            type_id: 17,
            timestamp: 0,
            unsigned_tx: r#"{"networkID":5,"memo":"0x01"}"#.to_string(),
            unsigned_bytes: "0x".to_string(),
            sig_bytes: String::new(),
            signer_addr_p: String::new(),
            signer_addr_c: String::new(),
        }
    }

    #[tokio::test]
    async fn test_raw_block_upsert() {
        let db = Database::in_memory().await.unwrap();

        insert_raw_block(db.pool(), 7, &[1, 2, 3]).await.unwrap();
        insert_raw_block(db.pool(), 7, &[1, 2, 3]).await.unwrap();

        assert_eq!(db.count_raw_blocks().await.unwrap(), 1);
        assert_eq!(db.get_raw_block(7).await.unwrap().unwrap().bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_block_transactions_commit_with_marker() {
        let db = Database::in_memory().await.unwrap();

        let inserted = insert_block_transactions(db.pool(), 3, &[record(3, "a"), record(3, "b")]).await.unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.count_transactions().await.unwrap(), 2);
        assert_eq!(db.get_processed_marker(3).await.unwrap().unwrap().tx_count, 2);

        let network_id = sqlx::query_scalar::<_, i64>("SELECT network_id FROM txs_p WHERE id = 'a'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(network_id, 5);
    }

    #[tokio::test]
    async fn test_empty_block_still_gets_marker() {
        let db = Database::in_memory().await.unwrap();

        assert_eq!(insert_block_transactions(db.pool(), 9, &[]).await.unwrap(), 0);
        assert!(db.is_processed(9).await.unwrap());
        assert_eq!(db.count_transactions().await.unwrap(), 0);
    }
}
