// SQLite-backed post history store.
//
// Tables:
// - post_history: one row per author key, timestamps as a JSON array

use crate::core::moderation::{AuthorGuard, AuthorLocks, ModerationError, PostHistoryStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteHistoryStore {
    pool: Pool<Sqlite>,
    locks: AuthorLocks,
}

impl SqliteHistoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            locks: AuthorLocks::new(),
        }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_history (
                author_key TEXT PRIMARY KEY,
                timestamps TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl PostHistoryStore for SqliteHistoryStore {
    async fn get_history(&self, author_key: &str) -> Result<Option<Vec<i64>>, ModerationError> {
        let row = sqlx::query("SELECT timestamps FROM post_history WHERE author_key = ?")
            .bind(author_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("timestamps");
        let history: Vec<i64> = serde_json::from_str(&raw).map_err(|e| {
            ModerationError::StorageError(format!("corrupt history for {}: {}", author_key, e))
        })?;
        Ok(Some(history))
    }

    async fn put_history(&self, author_key: &str, history: &[i64]) -> Result<(), ModerationError> {
        let raw = serde_json::to_string(history)
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO post_history (author_key, timestamps, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(author_key) DO UPDATE SET
                timestamps = excluded.timestamps,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(author_key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn lock_author(&self, author_key: &str) -> AuthorGuard {
        self.locks.acquire(author_key).await
    }
}
