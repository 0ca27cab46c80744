// Moderation domain models - data structures for the post decision engine.
//
// These are pure domain types with no forum API dependencies.
// The host layer converts platform events into these and acts on the decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A newly created submission. Immutable input to a single decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// The account that created a post, as delivered with the creation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: String,
    pub name: String,
}

/// A post-creation event. Either half may be missing when the platform
/// could not resolve it (deleted account, removed post).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEvent {
    pub subreddit: String,
    pub post: Option<Post>,
    pub author: Option<PostAuthor>,
}

/// Karma record returned by the platform for an author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorKarma {
    pub username: String,
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

impl AuthorKarma {
    pub fn total(&self) -> i64 {
        self.link_karma.saturating_add(self.comment_karma)
    }
}

/// What a content rule does to a matching post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Remove,
    Filter,
    Spam,
}

impl RuleAction {
    /// Spam removals train the platform's spam filter; the others don't.
    pub fn is_spam(&self) -> bool {
        matches!(self, RuleAction::Spam)
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleAction::Remove => write!(f, "remove"),
            RuleAction::Filter => write!(f, "filter"),
            RuleAction::Spam => write!(f, "spam"),
        }
    }
}

/// Outcome of moderating one post.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ModerationDecision {
    /// Nothing to do: the post stays up.
    Allow,
    RemoveByRule {
        rule: String,
        matched_value: String,
    },
    RemoveByRateLimit {
        karma: i64,
        limit: u32,
        recent_count: usize,
    },
    SpamByRule {
        rule: String,
        matched_value: String,
    },
    FilterByRule {
        rule: String,
        matched_value: String,
    },
}

impl ModerationDecision {
    pub fn by_rule(action: RuleAction, rule: &str, matched_value: &str) -> Self {
        let rule = rule.to_string();
        let matched_value = matched_value.to_string();
        match action {
            RuleAction::Remove => ModerationDecision::RemoveByRule {
                rule,
                matched_value,
            },
            RuleAction::Filter => ModerationDecision::FilterByRule {
                rule,
                matched_value,
            },
            RuleAction::Spam => ModerationDecision::SpamByRule {
                rule,
                matched_value,
            },
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, ModerationDecision::Allow)
    }
}

/// A row in the moderation audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModActionRecord {
    /// e.g. `RULE_SPAM_FILTER`, `REMOVE_LIMIT`, `TEST_REMOVE_LIMIT`
    pub action_type: String,
    pub username: String,
    pub details: String,
    pub submission_id: String,
    /// Whether a moderator may approve the post back from the queue.
    pub can_approve: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_karma_sums_both_components() {
        let karma = AuthorKarma {
            username: "alice".to_string(),
            link_karma: 120,
            comment_karma: 180,
        };
        assert_eq!(karma.total(), 300);
    }

    #[test]
    fn test_decision_serializes_with_tag() {
        let decision = ModerationDecision::RemoveByRateLimit {
            karma: 300,
            limit: 2,
            recent_count: 2,
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["decision"], "remove_by_rate_limit");
        assert_eq!(json["limit"], 2);

        let json = serde_json::to_value(ModerationDecision::Allow).unwrap();
        assert_eq!(json["decision"], "allow");
    }

    #[test]
    fn test_by_rule_maps_action_to_variant() {
        assert!(matches!(
            ModerationDecision::by_rule(RuleAction::Spam, "Spam Filter", "bitcoin"),
            ModerationDecision::SpamByRule { .. }
        ));
        assert!(matches!(
            ModerationDecision::by_rule(RuleAction::Filter, "Profanity Filter", "ass"),
            ModerationDecision::FilterByRule { .. }
        ));
        assert!(matches!(
            ModerationDecision::by_rule(RuleAction::Remove, "URL Shorteners", "bit.ly"),
            ModerationDecision::RemoveByRule { .. }
        ));
    }
}
