//! SQLite-backed checkpointer for single-process durability across restarts.
//!
//! Write-ahead-log mode gives concurrent readers alongside the single
//! writer sqlx serializes writes through. Schema is created on first
//! connect; there is exactly one table, keyed by `(thread_id, checkpoint_id)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{CheckpointError, Result};
use crate::traits::{CheckpointMetadata, CheckpointRecord, Checkpointer};

pub struct LocalDurableCheckpointer {
    pool: SqlitePool,
}

impl LocalDurableCheckpointer {
    /// Connect to `database_url` (e.g. `sqlite:kernel.db` or `sqlite::memory:`),
    /// enable WAL mode, and create the checkpoints table if absent.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                checkpoint_id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                snapshot BLOB NOT NULL,
                written_at TEXT NOT NULL,
                source TEXT NOT NULL,
                extra TEXT NOT NULL,
                seq INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_checkpoints_thread ON checkpoints (thread_id, seq)")
            .execute(&pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        Ok(Self { pool })
    }

    fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<CheckpointRecord> {
        let extra: String = row.try_get("extra").map_err(|e| CheckpointError::Storage(e.to_string()))?;
        let written_at: String = row.try_get("written_at").map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(CheckpointRecord {
            checkpoint_id: row.try_get("checkpoint_id").map_err(|e| CheckpointError::Storage(e.to_string()))?,
            thread_id: row.try_get("thread_id").map_err(|e| CheckpointError::Storage(e.to_string()))?,
            snapshot: row.try_get("snapshot").map_err(|e| CheckpointError::Storage(e.to_string()))?,
            metadata: CheckpointMetadata {
                written_at: written_at
                    .parse::<DateTime<Utc>>()
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?,
                source: row.try_get("source").map_err(|e| CheckpointError::Storage(e.to_string()))?,
                extra: serde_json::from_str(&extra)?,
            },
        })
    }
}

#[async_trait]
impl Checkpointer for LocalDurableCheckpointer {
    async fn put(
        &self,
        thread_id: &str,
        snapshot: Vec<u8>,
        metadata: CheckpointMetadata,
    ) -> Result<String> {
        let checkpoint_id = Uuid::new_v4().to_string();
        let extra = serde_json::to_string(&metadata.extra)?;

        let seq: i64 = sqlx::query("SELECT COALESCE(MAX(seq), -1) + 1 FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?
            .try_get(0)
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        sqlx::query(
            "INSERT INTO checkpoints (checkpoint_id, thread_id, snapshot, written_at, source, extra, seq)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&checkpoint_id)
        .bind(thread_id)
        .bind(&snapshot)
        .bind(metadata.written_at.to_rfc3339())
        .bind(&metadata.source)
        .bind(&extra)
        .bind(seq)
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        Ok(checkpoint_id)
    }

    async fn get(
        &self,
        thread_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<CheckpointRecord>> {
        let row = match checkpoint_id {
            Some(id) => {
                sqlx::query("SELECT * FROM checkpoints WHERE thread_id = ? AND checkpoint_id = ?")
                    .bind(thread_id)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC LIMIT 1")
                    .bind(thread_id)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>> {
        let rows = sqlx::query("SELECT * FROM checkpoints WHERE thread_id = ? ORDER BY seq DESC")
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }
}
