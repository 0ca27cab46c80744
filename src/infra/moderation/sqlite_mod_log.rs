// SQLite-backed moderation audit log.
//
// Tables:
// - mod_actions: one row per removal the bot made (or would have made in test mode)

use crate::core::moderation::{ModActionLog, ModActionRecord, ModerationError};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

pub struct SqliteModLog {
    pool: Pool<Sqlite>,
}

impl SqliteModLog {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mod_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action_type TEXT NOT NULL,
                username TEXT NOT NULL,
                details TEXT NOT NULL,
                submission_id TEXT,
                can_approve BOOLEAN NOT NULL DEFAULT 1,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mod_actions_username
                ON mod_actions(username, timestamp);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ModActionLog for SqliteModLog {
    async fn record(&self, entry: ModActionRecord) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO mod_actions (action_type, username, details, submission_id, can_approve, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.action_type)
        .bind(&entry.username)
        .bind(&entry.details)
        .bind(&entry.submission_id)
        .bind(entry.can_approve)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        Ok(())
    }
}
