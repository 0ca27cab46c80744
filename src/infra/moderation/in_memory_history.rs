// In-memory implementation of PostHistoryStore.
//
// Nothing survives a restart, so a restarted bot forgets everyone's recent
// posts. Useful for dry runs and tests.

use crate::core::moderation::{AuthorGuard, AuthorLocks, ModerationError, PostHistoryStore};
use async_trait::async_trait;
use dashmap::DashMap;

/// Maps author key -> post timestamps (epoch ms).
pub struct InMemoryHistoryStore {
    data: DashMap<String, Vec<i64>>,
    locks: AuthorLocks,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            locks: AuthorLocks::new(),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostHistoryStore for InMemoryHistoryStore {
    async fn get_history(&self, author_key: &str) -> Result<Option<Vec<i64>>, ModerationError> {
        Ok(self.data.get(author_key).map(|entry| entry.value().clone()))
    }

    async fn put_history(&self, author_key: &str, history: &[i64]) -> Result<(), ModerationError> {
        self.data.insert(author_key.to_string(), history.to_vec());
        Ok(())
    }

    async fn lock_author(&self, author_key: &str) -> AuthorGuard {
        self.locks.acquire(author_key).await
    }
}
