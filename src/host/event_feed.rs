// Newline-delimited JSON event intake.
//
// Each line is one post-creation event. Every event is moderated in order and
// answered with one JSON decision line.

use super::replay_platform::ReplayPlatform;
use crate::core::moderation::{
    AuthorKarma, ModerationDecision, Post, PostAuthor, PostEvent, PostHistoryStore,
    PostModerationService, TierSettings,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayKarma {
    #[serde(default)]
    pub link_karma: i64,
    #[serde(default)]
    pub comment_karma: i64,
}

/// One line of the event feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEvent {
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub post: Option<Post>,
    #[serde(default)]
    pub author: Option<PostAuthor>,
    /// Missing karma means the platform has no record of the author for this
    /// event, even if an earlier event carried some.
    #[serde(default)]
    pub karma: Option<ReplayKarma>,
    /// When the event was received; defaults to the time it's replayed.
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

impl ReplayEvent {
    fn into_post_event(self, default_subreddit: &str, platform: &ReplayPlatform) -> PostEvent {
        match (&self.post, &self.author, &self.karma) {
            (Some(post), Some(author), Some(karma)) => platform.remember_author(
                &post.author_id,
                AuthorKarma {
                    username: author.name.clone(),
                    link_karma: karma.link_karma,
                    comment_karma: karma.comment_karma,
                },
            ),
            // Karma from an earlier event must not leak into this one.
            (Some(post), _, None) => platform.forget_author(&post.author_id),
            _ => {}
        }

        PostEvent {
            subreddit: self
                .subreddit
                .unwrap_or_else(|| default_subreddit.to_string()),
            post: self.post,
            author: self.author,
        }
    }
}

#[derive(Debug, Serialize)]
struct DecisionLine<'a> {
    post_id: Option<&'a str>,
    #[serde(flatten)]
    decision: &'a ModerationDecision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Moderate every event from `reader`, writing one decision per line to `writer`.
pub async fn replay_events<R, W, H, T>(
    reader: R,
    mut writer: W,
    service: &PostModerationService<H, ReplayPlatform, T>,
    default_subreddit: &str,
) -> anyhow::Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    H: PostHistoryStore,
    T: TierSettings,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: ReplayEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed event");
                summary.skipped += 1;
                continue;
            }
        };

        let received_at = event.received_at;
        let event = event.into_post_event(default_subreddit, service.platform());
        let decision = match received_at {
            Some(at) => service.moderate_at(&event, at.timestamp_millis()).await,
            None => service.moderate(&event).await,
        };

        summary.processed += 1;
        if !decision.is_allow() {
            summary.removed += 1;
        }

        let output = serde_json::to_string(&DecisionLine {
            post_id: event.post.as_ref().map(|p| p.id.as_str()),
            decision: &decision,
        })?;
        writer.write_all(output.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{default_rules, RuleAction};
    use crate::infra::moderation::{FileTierSettings, InMemoryHistoryStore};

    fn service(
        moderators: &[&str],
    ) -> PostModerationService<InMemoryHistoryStore, ReplayPlatform, FileTierSettings> {
        PostModerationService::new(
            InMemoryHistoryStore::new(),
            ReplayPlatform::new(moderators.iter().map(|m| m.to_string())),
            FileTierSettings::new("/nonexistent/tiers.json"),
            default_rules().unwrap(),
        )
    }

    fn line(id: &str, author: &str, title: &str, url: Option<&str>, at: &str) -> String {
        serde_json::json!({
            "post": {
                "id": id,
                "title": title,
                "body": "",
                "url": url,
                "author_id": format!("t2_{}", author),
                "created_at": at,
            },
            "author": {"id": format!("t2_{}", author), "name": author},
            "karma": {"link_karma": 100, "comment_karma": 200},
            "received_at": at,
        })
        .to_string()
    }

    async fn run(
        service: &PostModerationService<InMemoryHistoryStore, ReplayPlatform, FileTierSettings>,
        input: String,
    ) -> (ReplaySummary, Vec<serde_json::Value>) {
        let mut output = Vec::new();
        let summary = replay_events(input.as_bytes(), &mut output, service, "SydneyTrains")
            .await
            .unwrap();
        let decisions = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, decisions)
    }

    #[tokio::test]
    async fn test_replays_in_order_with_rate_limit() {
        let service = service(&[]);
        let input = [
            line("t3_1", "alice", "Morning commute", None, "2025-03-01T08:00:00Z"),
            line("t3_2", "alice", "Evening commute", None, "2025-03-01T18:00:00Z"),
            line("t3_3", "alice", "Night commute", None, "2025-03-01T23:00:00Z"),
            line("t3_4", "alice", "Next day", None, "2025-03-02T08:30:00Z"),
        ]
        .join("\n");

        let (summary, decisions) = run(&service, input).await;

        assert_eq!(
            summary,
            ReplaySummary {
                processed: 4,
                removed: 1,
                skipped: 0
            }
        );
        assert_eq!(decisions[0]["decision"], "allow");
        assert_eq!(decisions[1]["decision"], "allow");
        assert_eq!(decisions[2]["decision"], "remove_by_rate_limit");
        assert_eq!(decisions[2]["post_id"], "t3_3");
        assert_eq!(decisions[2]["karma"], 300);
        assert_eq!(decisions[2]["recent_count"], 2);
        // 08:00 has left the window by 08:30 the next day.
        assert_eq!(decisions[3]["decision"], "allow");

        let applied = service.platform().applied_actions().await;
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].post_id, "t3_3");
        assert_eq!(applied[0].action, RuleAction::Remove);
    }

    #[tokio::test]
    async fn test_rule_hits_and_moderators() {
        let service = service(&["mod_steve"]);
        let input = [
            line("t3_1", "bob", "Look", Some("https://www.bit.ly/x"), "2025-03-01T08:00:00Z"),
            line("t3_2", "mod_steve", "Look", Some("https://bit.ly/x"), "2025-03-01T08:01:00Z"),
        ]
        .join("\n");

        let (_, decisions) = run(&service, input).await;

        assert_eq!(decisions[0]["decision"], "remove_by_rule");
        assert_eq!(decisions[0]["rule"], "URL Shorteners");
        assert_eq!(decisions[0]["matched_value"], "bit.ly");
        assert_eq!(decisions[1]["decision"], "allow");
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let service = service(&[]);
        let input = format!(
            "not json\n\n{}\n{{\"post\": null, \"author\": null}}\n",
            line("t3_1", "carol", "Hi", None, "2025-03-01T08:00:00Z")
        );

        let (summary, decisions) = run(&service, input).await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.processed, 2);
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[1]["post_id"], serde_json::Value::Null);
        assert_eq!(decisions[1]["decision"], "allow");
    }

    #[tokio::test]
    async fn test_event_without_karma_is_allowed() {
        let service = service(&[]);
        let mut event: serde_json::Value =
            serde_json::from_str(&line("t3_1", "dave", "Hi", None, "2025-03-01T08:00:00Z"))
                .unwrap();
        event.as_object_mut().unwrap().remove("karma");

        let (summary, decisions) = run(&service, event.to_string()).await;

        assert_eq!(summary.removed, 0);
        assert_eq!(decisions[0]["decision"], "allow");
    }

    #[tokio::test]
    async fn test_karma_is_not_carried_over_between_events() {
        let service = service(&[]);
        // 100 + 200 karma allows two posts a day; the third would be removed.
        let mut third: serde_json::Value =
            serde_json::from_str(&line("t3_3", "erin", "Third", None, "2025-03-01T10:00:00Z"))
                .unwrap();
        third.as_object_mut().unwrap().remove("karma");
        let input = [
            line("t3_1", "erin", "First", None, "2025-03-01T08:00:00Z"),
            line("t3_2", "erin", "Second", None, "2025-03-01T09:00:00Z"),
            third.to_string(),
        ]
        .join("\n");

        let (summary, decisions) = run(&service, input).await;

        assert_eq!(summary.removed, 0);
        assert_eq!(decisions[2]["post_id"], "t3_3");
        assert_eq!(decisions[2]["decision"], "allow");
        assert!(service.platform().applied_actions().await.is_empty());
    }
}
