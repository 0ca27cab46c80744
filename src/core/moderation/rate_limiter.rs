// Rolling-window post limiter.
//
// Each author has a list of post timestamps (epoch ms). On every check the
// list is pruned to the last 24 hours; the post is admitted only while the
// pruned count is under the author's limit. Denied attempts are not recorded.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 24 hours in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Result of a rate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    /// Pruned history, with `now` appended when admitted.
    pub history: Vec<i64>,
    /// Posts inside the window before this one.
    pub recent_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RollingWindowLimiter {
    window_ms: i64,
}

impl RollingWindowLimiter {
    pub fn new(window_ms: i64) -> Self {
        Self { window_ms }
    }

    pub fn daily() -> Self {
        Self::new(DAY_MS)
    }

    /// Prune `history` to the window ending at `now_ms` and decide.
    pub fn check_and_record(
        &self,
        author_key: &str,
        now_ms: i64,
        history: Vec<i64>,
        limit: u32,
    ) -> RateDecision {
        let mut pruned: Vec<i64> = history
            .into_iter()
            .filter(|ts| now_ms - ts < self.window_ms)
            .collect();
        let recent_count = pruned.len();
        let admitted = recent_count < limit as usize;

        if admitted {
            pruned.push(now_ms);
        }

        tracing::debug!(
            author = author_key,
            recent = recent_count,
            limit,
            admitted,
            "Rolling window check"
        );

        RateDecision {
            admitted,
            history: pruned,
            recent_count,
        }
    }
}

impl Default for RollingWindowLimiter {
    fn default() -> Self {
        Self::daily()
    }
}

/// Per-author locks that serialize the read-prune-decide-write sequence.
///
/// Two posts by the same author must not both read the pre-update history,
/// otherwise both would be admitted. An author's entry is dropped again once
/// nobody holds or waits on its lock.
#[derive(Debug, Default)]
pub struct AuthorLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl AuthorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, author_key: &str) -> AuthorGuard {
        // Clone the Arc out so the map shard isn't held across the await.
        let lock = self
            .locks
            .entry(author_key.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        AuthorGuard {
            author_key: author_key.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }
}

/// Held for the duration of one author's history update.
#[derive(Debug)]
pub struct AuthorGuard {
    author_key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AuthorGuard {
    fn drop(&mut self) {
        // Release first so the map holds the only reference when idle.
        self.guard.take();
        // remove_if runs under the shard lock, so no acquirer can clone the
        // Arc between the count check and the removal.
        self.locks
            .remove_if(&self.author_key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
