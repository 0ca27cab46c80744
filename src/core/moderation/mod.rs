// Core moderation module - the post decision engine.
// Extractor -> rules -> tier resolver -> rolling-window limiter.

pub mod content;
pub mod moderation_models;
pub mod moderation_service;
pub mod rate_limiter;
pub mod rules;
pub mod template;
pub mod tiers;

pub use content::*;
pub use moderation_models::*;
pub use moderation_service::*;
pub use rate_limiter::*;
pub use rules::*;
pub use tiers::*;
