// Runtime configuration read from the environment (and `.env`).

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub subreddit_name: String,
    pub data_dir: PathBuf,
    pub tiers_file: PathBuf,
    pub rules_file: Option<PathBuf>,
    pub moderators: Vec<String>,
    /// Decide and log, but never touch posts.
    pub test_mode: bool,
    pub history_backend: HistoryBackend,
    /// Newline-delimited JSON post events; stdin when unset.
    pub events_file: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let history_backend = match non_empty("HISTORY_STORE").as_deref() {
            Some("memory") => HistoryBackend::Memory,
            Some("sqlite") | None => HistoryBackend::Sqlite,
            Some(other) => {
                tracing::warn!("Unknown HISTORY_STORE '{}', using sqlite", other);
                HistoryBackend::Sqlite
            }
        };

        Self {
            subreddit_name: non_empty("SUBREDDIT_NAME").unwrap_or_else(|| "SydneyTrains".to_string()),
            data_dir: non_empty("DATA_DIR").map_or_else(|| PathBuf::from("data"), PathBuf::from),
            tiers_file: non_empty("TIERS_FILE")
                .map_or_else(|| PathBuf::from("tiers.json"), PathBuf::from),
            rules_file: non_empty("RULES_FILE").map(PathBuf::from),
            moderators: non_empty("MODERATORS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            test_mode: non_empty("TEST_MODE")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            history_backend,
            events_file: non_empty("EVENTS_FILE").map(PathBuf::from),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("post_limit_bot.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> BotConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.subreddit_name, "SydneyTrains");
        assert_eq!(config.tiers_file, PathBuf::from("tiers.json"));
        assert_eq!(config.database_path(), PathBuf::from("data/post_limit_bot.db"));
        assert!(config.moderators.is_empty());
        assert!(!config.test_mode);
        assert_eq!(config.history_backend, HistoryBackend::Sqlite);
        assert!(config.rules_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SUBREDDIT_NAME", "MelbourneTrains"),
            ("MODERATORS", "alice, bob,,"),
            ("TEST_MODE", "TRUE"),
            ("HISTORY_STORE", "memory"),
            ("RULES_FILE", "automod.json"),
        ]);
        assert_eq!(config.subreddit_name, "MelbourneTrains");
        assert_eq!(config.moderators, vec!["alice", "bob"]);
        assert!(config.test_mode);
        assert_eq!(config.history_backend, HistoryBackend::Memory);
        assert_eq!(config.rules_file, Some(PathBuf::from("automod.json")));
    }
}
