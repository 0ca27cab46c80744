// Post moderation service - core business logic for new submissions.
//
// This service handles, in order:
// - Moderator exemption
// - Content rules (first match wins, skips everything after)
// - Karma tier lookup
// - Rolling 24h posting limit
//
// NO forum API dependencies here - the platform is reached through ports.

use super::content::extract;
use super::moderation_models::{
    AuthorKarma, ModActionRecord, ModerationDecision, Post, PostAuthor, PostEvent, RuleAction,
};
use super::rate_limiter::{AuthorGuard, RollingWindowLimiter};
use super::rules::{evaluate, rule_action_type, Rule, RuleMatch};
use super::template::TemplateValues;
use super::tiers::{parse_tiers, resolve_limit, KarmaTier};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[allow(dead_code)]
    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Persistent per-author post timestamps.
///
/// Implementations must hand out a per-author lock so the rate check's
/// read-modify-write is atomic per key.
#[async_trait]
pub trait PostHistoryStore: Send + Sync {
    /// Stored timestamps (epoch ms), or `None` if the author has none.
    async fn get_history(&self, author_key: &str) -> Result<Option<Vec<i64>>, ModerationError>;

    async fn put_history(&self, author_key: &str, history: &[i64]) -> Result<(), ModerationError>;

    /// Held across get/decide/put for one author.
    async fn lock_author(&self, author_key: &str) -> AuthorGuard;
}

/// The forum API: who moderates, author karma, and moderation actions.
#[async_trait]
pub trait ForumPlatform: Send + Sync {
    async fn get_moderators(&self, subreddit: &str) -> Result<HashSet<String>, ModerationError>;

    /// `None` when the author record can't be found.
    async fn get_author_karma(
        &self,
        author_id: &str,
    ) -> Result<Option<AuthorKarma>, ModerationError>;

    /// Remove the post (as spam if the action says so) and, if a message is
    /// given, reply with it as a distinguished, pinned comment.
    async fn apply_action(
        &self,
        post_id: &str,
        action: RuleAction,
        message: Option<&str>,
    ) -> Result<(), ModerationError>;
}

/// Where the serialized karma tier list lives.
#[async_trait]
pub trait TierSettings: Send + Sync {
    async fn load_tier_config(&self) -> Result<Option<String>, ModerationError>;
}

/// Audit trail of removals.
#[async_trait]
pub trait ModActionLog: Send + Sync {
    async fn record(&self, entry: ModActionRecord) -> Result<(), ModerationError>;
}

/// Discards every entry.
pub struct NoopModLog;

#[async_trait]
impl ModActionLog for NoopModLog {
    async fn record(&self, _entry: ModActionRecord) -> Result<(), ModerationError> {
        Ok(())
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Storage key for an author's post history.
pub fn history_key(username: &str) -> String {
    format!("post_history:{}", username)
}

/// Comment left on posts removed for exceeding the daily limit.
pub fn rate_limit_message(username: &str, karma: i64, limit: u32) -> String {
    format!(
        "Hi u/{}, your post has been removed because you have reached your daily posting limit.\n\n\
         Your account has **{} karma**, which limits you to **{} post(s)** per 24 hours.\n\n\
         Please try again tomorrow!",
        username, karma, limit
    )
}

const REMOVE_LIMIT: &str = "REMOVE_LIMIT";

/// Decides what happens to each new post.
pub struct PostModerationService<H: PostHistoryStore, P: ForumPlatform, T: TierSettings> {
    history: H,
    platform: P,
    tier_settings: T,
    rules: Vec<Rule>,
    limiter: RollingWindowLimiter,
    mod_log: Arc<dyn ModActionLog>,
    dry_run: bool,
}

impl<H: PostHistoryStore, P: ForumPlatform, T: TierSettings> PostModerationService<H, P, T> {
    /// Create a new service. `rules` are evaluated in the given order.
    pub fn new(history: H, platform: P, tier_settings: T, rules: Vec<Rule>) -> Self {
        Self {
            history,
            platform,
            tier_settings,
            rules,
            limiter: RollingWindowLimiter::daily(),
            mod_log: Arc::new(NoopModLog),
            dry_run: false,
        }
    }

    pub fn with_mod_log(mut self, mod_log: Arc<dyn ModActionLog>) -> Self {
        self.mod_log = mod_log;
        self
    }

    /// In dry-run mode decisions are made and history is kept, but no action
    /// reaches the platform.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Moderate a new post using the current time.
    pub async fn moderate(&self, event: &PostEvent) -> ModerationDecision {
        self.moderate_at(event, Utc::now().timestamp_millis()).await
    }

    /// Moderate a new post as of `now_ms` (epoch milliseconds).
    ///
    /// Never fails: every collaborator error degrades to taking no action,
    /// except that an already-decided removal is always carried out.
    pub async fn moderate_at(&self, event: &PostEvent, now_ms: i64) -> ModerationDecision {
        let (Some(post), Some(author)) = (&event.post, &event.author) else {
            tracing::debug!("Ignoring post event without post or author");
            return ModerationDecision::Allow;
        };
        tracing::debug!(
            post_id = %post.id,
            author_id = %author.id,
            created_at = %post.created_at,
            "Moderating new post"
        );

        match self.platform.get_moderators(&event.subreddit).await {
            Ok(moderators) if moderators.contains(&author.name) => {
                tracing::info!(author = %author.name, "Skipping checks for mod");
                return ModerationDecision::Allow;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(post_id = %post.id, error = %e, "Could not load moderators, taking no action");
                return ModerationDecision::Allow;
            }
        }

        let content = extract(post);
        if let Some(hit) = evaluate(&content, &self.rules) {
            return self.enforce_rule(post, author, hit).await;
        }

        let karma = match self.platform.get_author_karma(&post.author_id).await {
            Ok(Some(karma)) => karma,
            Ok(None) => {
                tracing::info!(author = %author.name, "Author record not found, taking no action");
                return ModerationDecision::Allow;
            }
            Err(e) => {
                tracing::warn!(author = %author.name, error = %e, "Could not fetch karma, taking no action");
                return ModerationDecision::Allow;
            }
        };

        self.enforce_rate_limit(post, &karma, now_ms).await
    }

    async fn enforce_rule(
        &self,
        post: &Post,
        author: &PostAuthor,
        hit: RuleMatch<'_>,
    ) -> ModerationDecision {
        let rule = hit.rule;
        tracing::info!(
            rule = %rule.name,
            post_id = %post.id,
            matched = %hit.matched_value,
            "Triggered rule"
        );

        let message = rule.message.as_ref().map(|template| {
            template.render(&TemplateValues {
                author: &author.name,
                matched: &hit.matched_value,
                kind: "submission",
            })
        });

        self.apply(post, rule.action, message.as_deref()).await;
        self.log_action(
            &rule_action_type(&rule.name),
            &author.name,
            format!("Match: {}", hit.matched_value),
            &post.id,
            rule.allow_approval,
        )
        .await;

        ModerationDecision::by_rule(rule.action, &rule.name, &hit.matched_value)
    }

    async fn enforce_rate_limit(
        &self,
        post: &Post,
        karma: &AuthorKarma,
        now_ms: i64,
    ) -> ModerationDecision {
        let total_karma = karma.total();
        let tiers = self.load_tiers().await;
        let limit = resolve_limit(total_karma, &tiers);
        let key = history_key(&karma.username);

        let outcome = {
            let _guard = self.history.lock_author(&key).await;

            let (stored, writable) = match self.history.get_history(&key).await {
                Ok(history) => (history.unwrap_or_default(), true),
                Err(e) => {
                    // Don't write back: that would wipe the real history.
                    tracing::warn!(author = %karma.username, error = %e, "Could not read post history, treating as empty");
                    (Vec::new(), false)
                }
            };
            let stored_len = stored.len();

            let outcome = self
                .limiter
                .check_and_record(&key, now_ms, stored, limit);

            if writable && (outcome.admitted || outcome.history.len() != stored_len) {
                if let Err(e) = self.history.put_history(&key, &outcome.history).await {
                    tracing::warn!(author = %karma.username, error = %e, "Could not save post history, this post is not counted");
                }
            }

            outcome
        };

        tracing::info!(
            author = %karma.username,
            karma = total_karma,
            limit,
            recent = outcome.recent_count,
            "Checked posting rate"
        );

        if outcome.admitted {
            return ModerationDecision::Allow;
        }

        tracing::info!(post_id = %post.id, author = %karma.username, "Removing post over daily limit");
        let message = rate_limit_message(&karma.username, total_karma, limit);
        self.apply(post, RuleAction::Remove, Some(&message)).await;
        self.log_action(
            REMOVE_LIMIT,
            &karma.username,
            format!("Karma: {}, Limit: {}", total_karma, limit),
            &post.id,
            true,
        )
        .await;

        ModerationDecision::RemoveByRateLimit {
            karma: total_karma,
            limit,
            recent_count: outcome.recent_count,
        }
    }

    async fn load_tiers(&self) -> Vec<KarmaTier> {
        match self.tier_settings.load_tier_config().await {
            Ok(raw) => parse_tiers(raw.as_deref()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load tiers setting, using default");
                parse_tiers(None)
            }
        }
    }

    async fn apply(&self, post: &Post, action: RuleAction, message: Option<&str>) {
        if self.dry_run {
            tracing::info!(post_id = %post.id, %action, "[TEST MODE] Would apply action");
            if let Some(message) = message {
                let first_line = message.lines().next().unwrap_or_default();
                tracing::info!(post_id = %post.id, "[TEST MODE] Would reply: {}...", first_line);
            }
            return;
        }

        if let Err(e) = self.platform.apply_action(&post.id, action, message).await {
            tracing::error!(post_id = %post.id, %action, error = %e, "Failed to apply moderation action");
        }
    }

    async fn log_action(
        &self,
        action_type: &str,
        username: &str,
        details: String,
        submission_id: &str,
        can_approve: bool,
    ) {
        let action_type = if self.dry_run {
            format!("TEST_{}", action_type)
        } else {
            action_type.to_string()
        };

        let entry = ModActionRecord {
            action_type,
            username: username.to_string(),
            details,
            submission_id: submission_id.to_string(),
            can_approve,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.mod_log.record(entry).await {
            tracing::warn!(error = %e, "Failed to log action");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
