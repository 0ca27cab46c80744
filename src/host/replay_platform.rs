// Stand-in forum platform for replaying recorded post events.
//
// Moderators come from configuration and karma arrives with each replayed
// event. Actions are logged and kept in memory instead of hitting the API.

use crate::core::moderation::{AuthorKarma, ForumPlatform, ModerationError, RuleAction};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// An action the engine asked the platform to take.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedAction {
    pub post_id: String,
    pub action: RuleAction,
    pub comment: Option<String>,
}

pub struct ReplayPlatform {
    moderators: HashSet<String>,
    /// Author ID -> latest karma seen in the feed
    karma: DashMap<String, AuthorKarma>,
    applied: RwLock<Vec<AppliedAction>>,
}

impl ReplayPlatform {
    pub fn new(moderators: impl IntoIterator<Item = String>) -> Self {
        Self {
            moderators: moderators.into_iter().collect(),
            karma: DashMap::new(),
            applied: RwLock::new(Vec::new()),
        }
    }

    pub fn remember_author(&self, author_id: &str, karma: AuthorKarma) {
        self.karma.insert(author_id.to_string(), karma);
    }

    pub fn forget_author(&self, author_id: &str) {
        self.karma.remove(author_id);
    }

    pub async fn applied_actions(&self) -> Vec<AppliedAction> {
        self.applied.read().await.clone()
    }
}

#[async_trait]
impl ForumPlatform for ReplayPlatform {
    async fn get_moderators(&self, _subreddit: &str) -> Result<HashSet<String>, ModerationError> {
        Ok(self.moderators.clone())
    }

    async fn get_author_karma(
        &self,
        author_id: &str,
    ) -> Result<Option<AuthorKarma>, ModerationError> {
        Ok(self.karma.get(author_id).map(|entry| entry.value().clone()))
    }

    async fn apply_action(
        &self,
        post_id: &str,
        action: RuleAction,
        message: Option<&str>,
    ) -> Result<(), ModerationError> {
        tracing::info!(post_id, %action, spam = action.is_spam(), "Removing post");
        if message.is_some() {
            tracing::info!(post_id, "Posting distinguished comment");
        }

        self.applied.write().await.push(AppliedAction {
            post_id: post_id.to_string(),
            action,
            comment: message.map(str::to_string),
        });
        Ok(())
    }
}
