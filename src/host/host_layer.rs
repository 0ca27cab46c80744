// Host layer - event intake and the platform stand-in used to replay events.

pub mod event_feed;
pub mod replay_platform;

pub use event_feed::{replay_events, ReplaySummary};
pub use replay_platform::ReplayPlatform;
