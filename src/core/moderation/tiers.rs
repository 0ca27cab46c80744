// Karma tiers - map an author's total karma to a daily posting limit.

use serde::{Deserialize, Deserializer, Serialize};

/// Limit used when no tier applies to a karma value.
pub const FALLBACK_LIMIT: u32 = 4;

/// A karma threshold paired with a posting limit.
///
/// Serialized as `{"maxKarma": 250, "limit": 1}`; `maxKarma: null` means
/// unbounded. A tier without a `maxKarma` key never applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmaTier {
    /// `None` when the key is missing, `Some(None)` when it is `null`.
    #[serde(
        default,
        alias = "max_karma",
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_karma: Option<Option<i64>>,
    pub limit: u32,
}

/// Marks a present key, so `null` can be told apart from a missing one.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

impl KarmaTier {
    pub fn bounded(max_karma: i64, limit: u32) -> Self {
        Self {
            max_karma: Some(Some(max_karma)),
            limit,
        }
    }

    pub fn unbounded(limit: u32) -> Self {
        Self {
            max_karma: Some(None),
            limit,
        }
    }

    fn covers(&self, karma: i64) -> bool {
        match self.max_karma {
            Some(Some(max)) => karma < max,
            Some(None) => true,
            None => false,
        }
    }
}

/// `[{<250: 1}, {<500: 2}, {unbounded: 4}]`
pub fn default_tiers() -> Vec<KarmaTier> {
    vec![
        KarmaTier::bounded(250, 1),
        KarmaTier::bounded(500, 2),
        KarmaTier::unbounded(4),
    ]
}

/// Parse a serialized tier list, falling back to [`default_tiers`] when the
/// setting is absent, blank or malformed.
pub fn parse_tiers(raw: Option<&str>) -> Vec<KarmaTier> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default_tiers();
    };

    match serde_json::from_str::<Vec<KarmaTier>>(raw) {
        Ok(tiers) => tiers,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse tiers setting, using default");
            default_tiers()
        }
    }
}

/// Limit of the first tier whose bound exceeds `karma`.
///
/// Returns [`FALLBACK_LIMIT`] if no tier applies, which only happens when the
/// list has no unbounded tier.
pub fn resolve_limit(karma: i64, tiers: &[KarmaTier]) -> u32 {
    tiers
        .iter()
        .find(|tier| tier.covers(karma))
        .map_or(FALLBACK_LIMIT, |tier| tier.limit)
}
