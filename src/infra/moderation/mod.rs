// Implementations for the moderation ports.

pub mod file_tier_settings;
pub mod in_memory_history;
pub mod rules_file;
pub mod sqlite_history_store;
pub mod sqlite_mod_log;

// Re-export for convenience
pub use file_tier_settings::FileTierSettings;
pub use in_memory_history::InMemoryHistoryStore;
pub use rules_file::load_rules;
pub use sqlite_history_store::SqliteHistoryStore;
pub use sqlite_mod_log::SqliteModLog;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Open (creating if needed) the SQLite database at `path`.
pub async fn open_pool(path: &Path) -> anyhow::Result<Pool<Sqlite>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await?;
    Ok(pool)
}
