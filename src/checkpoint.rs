//! Durable checkpoint store.
//!
//! Records the id of the last case committed to the case store, under a
//! single sentinel key in SQLite. The checkpoint is the sole source of truth
//! for resumption: it only advances after an artifact is durably written,
//! and a malformed stored value is treated as absent (logged), never as a
//! fatal error — duplicate reprocessing is safer than silent loss.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::models;

/// Sentinel key for the single checkpoint record.
pub const CHECKPOINT_KEY: &str = "last_case_id";

pub struct CheckpointStore {
    pool: SqlitePool,
}

impl CheckpointStore {
    /// Open (creating if missing) the checkpoint database and ensure the
    /// schema exists. Schema creation is idempotent.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open checkpoint db: {}", db_path.display()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                key TEXT PRIMARY KEY,
                case_id TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// The last committed case id, or `None` on first run.
    ///
    /// A stored value that is not shaped like a case id is logged and
    /// reported as absent, so the next run re-ingests rather than resuming
    /// from garbage.
    pub async fn get(&self) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT case_id FROM checkpoints WHERE key = ?")
                .bind(CHECKPOINT_KEY)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.and_then(|v| {
            if models::is_case_id(&v) {
                Some(v)
            } else {
                eprintln!(
                    "Warning: malformed checkpoint value '{}'; treating as absent",
                    v
                );
                None
            }
        }))
    }

    /// Advance the checkpoint. Callers invoke this only after the
    /// corresponding batch is durably written — write, then checkpoint,
    /// never the reverse.
    pub async fn set(&self, case_id: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO checkpoints (key, case_id, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                case_id = excluded.case_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(CHECKPOINT_KEY)
        .bind(case_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Unix timestamp of the last checkpoint advance, for status reporting.
    pub async fn last_updated(&self) -> Result<Option<i64>> {
        let ts: Option<i64> = sqlx::query_scalar("SELECT updated_at FROM checkpoints WHERE key = ?")
            .bind(CHECKPOINT_KEY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ts)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_temp() -> (TempDir, CheckpointStore) {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::open(&tmp.path().join("checkpoint.sqlite"))
            .await
            .unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn test_absent_on_first_open() {
        let (_tmp, store) = open_temp().await;
        assert_eq!(store.get().await.unwrap(), None);
        assert_eq!(store.last_updated().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (_tmp, store) = open_temp().await;
        store.set("case-1714089600-5f2a91c3").await.unwrap();
        assert_eq!(
            store.get().await.unwrap().as_deref(),
            Some("case-1714089600-5f2a91c3")
        );
        assert!(store.last_updated().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (_tmp, store) = open_temp().await;
        store.set("case-1714089600-aa").await.unwrap();
        store.set("case-1714089660-bb").await.unwrap();
        assert_eq!(
            store.get().await.unwrap().as_deref(),
            Some("case-1714089660-bb")
        );
    }

    #[tokio::test]
    async fn test_malformed_value_treated_as_absent() {
        let (_tmp, store) = open_temp().await;
        // Corrupt the record directly, bypassing set(). A `case-` prefix
        // without a parseable timestamp is just as unusable as garbage.
        for corrupt in ["not-a-case-id", "case-x", "case-1714089600", ""] {
            sqlx::query(
                r#"
                INSERT INTO checkpoints (key, case_id, updated_at) VALUES (?, ?, 0)
                ON CONFLICT(key) DO UPDATE SET case_id = excluded.case_id
                "#,
            )
            .bind(CHECKPOINT_KEY)
            .bind(corrupt)
            .execute(&store.pool)
            .await
            .unwrap();
            assert_eq!(store.get().await.unwrap(), None, "value: '{}'", corrupt);
        }
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("checkpoint.sqlite");

        let store = CheckpointStore::open(&db_path).await.unwrap();
        store.set("case-1714089600-cc").await.unwrap();
        store.close().await;

        let reopened = CheckpointStore::open(&db_path).await.unwrap();
        assert_eq!(
            reopened.get().await.unwrap().as_deref(),
            Some("case-1714089600-cc")
        );
    }
}
