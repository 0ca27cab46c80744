// This is the entry point of the post limit bot.
//
// **Architecture Overview:**
// - `core/` = Decision engine (platform-agnostic): rules, karma tiers, rolling limit
// - `infra/` = Implementations of core traits (SQLite, in-memory, settings files)
// - `host/` = Event intake and the platform stand-in that receives actions
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Feed post events through the engine

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "host/host_layer.rs"]
mod host;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::{BotConfig, HistoryBackend};
use crate::core::moderation::{PostHistoryStore, PostModerationService, Rule};
use crate::host::{replay_events, ReplayPlatform};
use crate::infra::moderation::{
    load_rules, open_pool, FileTierSettings, InMemoryHistoryStore, SqliteHistoryStore,
    SqliteModLog,
};
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening.
    // Logs go to stderr; stdout carries the decision lines.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = BotConfig::from_env();

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = open_pool(&config.database_path()).await?;

    let mod_log = SqliteModLog::new(pool.clone());
    mod_log.migrate().await?;

    let rules = load_rules(config.rules_file.as_deref())?;

    match config.history_backend {
        HistoryBackend::Sqlite => {
            let history = SqliteHistoryStore::new(pool);
            history.migrate().await?;
            run(&config, history, rules, Arc::new(mod_log)).await
        }
        HistoryBackend::Memory => {
            run(&config, InMemoryHistoryStore::new(), rules, Arc::new(mod_log)).await
        }
    }
}

async fn run<H: PostHistoryStore>(
    config: &BotConfig,
    history: H,
    rules: Vec<Rule>,
    mod_log: Arc<SqliteModLog>,
) -> anyhow::Result<()> {
    let platform = ReplayPlatform::new(config.moderators.iter().cloned());
    let tier_settings = FileTierSettings::new(&config.tiers_file);

    let service = PostModerationService::new(history, platform, tier_settings, rules)
        .with_dry_run(config.test_mode)
        .with_mod_log(mod_log);

    tracing::info!(
        subreddit = %config.subreddit_name,
        rules = service.rules().len(),
        "Listening for new posts"
    );
    if config.test_mode {
        tracing::warn!("RUNNING IN TEST MODE - No actions will be taken on posts");
    }

    let stdout = tokio::io::stdout();
    let summary = match &config.events_file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            replay_events(BufReader::new(file), stdout, &service, &config.subreddit_name).await?
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            replay_events(stdin, stdout, &service, &config.subreddit_name).await?
        }
    };

    tracing::info!(
        processed = summary.processed,
        removed = summary.removed,
        skipped = summary.skipped,
        actions = service.platform().applied_actions().await.len(),
        "Event feed finished"
    );

    Ok(())
}
