// File-backed tier settings.
//
// A missing file means no tier setting, so the engine uses its default tiers.

use crate::core::moderation::{ModerationError, TierSettings};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads the raw tier list from a JSON file on every decision, so edits take
/// effect without a restart.
pub struct FileTierSettings {
    path: PathBuf,
}

impl FileTierSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TierSettings for FileTierSettings {
    async fn load_tier_config(&self) -> Result<Option<String>, ModerationError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ModerationError::ConfigError(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
