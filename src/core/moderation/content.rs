// Content extraction - normalizes a post into the fields rules reason over.

use super::moderation_models::Post;
use serde::{Deserialize, Serialize};
use url::Url;

/// The parts of a post that content rules can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentField {
    Title,
    Body,
    Domain,
}

/// Normalized view of a post. Derived once per post and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedContent {
    pub title: String,
    pub body: String,
    /// Link hostname without a leading `www.`, or empty for text posts.
    pub domain: String,
}

impl ExtractedContent {
    pub fn field(&self, field: ContentField) -> &str {
        match field {
            ContentField::Title => &self.title,
            ContentField::Body => &self.body,
            ContentField::Domain => &self.domain,
        }
    }
}

/// Extract title, body and link domain from a post.
pub fn extract(post: &Post) -> ExtractedContent {
    ExtractedContent {
        title: post.title.clone(),
        body: post.body.clone(),
        domain: extract_domain(post.url.as_deref()),
    }
}

/// Hostname of an http(s) link with one leading `www.` removed.
///
/// A URL that fails to parse yields an empty domain; the rest of the post is
/// still moderated.
pub fn extract_domain(url: Option<&str>) -> String {
    let Some(raw) = url.filter(|u| u.starts_with("http")) else {
        return String::new();
    };

    match Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            host.strip_prefix("www.").unwrap_or(host).to_string()
        }
        Err(e) => {
            tracing::debug!(url = raw, error = %e, "Could not parse post URL");
            String::new()
        }
    }
}
