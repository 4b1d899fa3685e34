//! # Messaging Domain Enums — Single Source of Truth
//!
//! `MessagingTier`, `QualityRating`, and `SendCategory` are each defined
//! once here and shared by the compliance gate (capacity and health
//! checks), the segmentation engine (frequency caps), and the dispatcher
//! (hard send ceilings). A single definition prevents the tier table from
//! drifting between the capacity check and the ceiling enforcement.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

// ─── Messaging Tier ──────────────────────────────────────────────────

/// Account-level messaging tier, bounding unique recipients per period.
///
/// | Tier | Daily limit |
/// |------|-------------|
/// | Unverified | 250 |
/// | Tier 1 | 1,000 |
/// | Tier 2 | 10,000 |
/// | Tier 3 | 100,000 |
/// | Tier 4 | unlimited |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingTier {
    /// Business not yet verified by the provider.
    Unverified,
    /// Tier 1 — 1,000 unique recipients per period.
    Tier1,
    /// Tier 2 — 10,000 unique recipients per period.
    Tier2,
    /// Tier 3 — 100,000 unique recipients per period.
    Tier3,
    /// Tier 4 — no per-period ceiling.
    Tier4,
}

impl MessagingTier {
    /// All tiers in ascending order.
    pub fn all() -> &'static [MessagingTier] {
        &[
            Self::Unverified,
            Self::Tier1,
            Self::Tier2,
            Self::Tier3,
            Self::Tier4,
        ]
    }

    /// The per-period send ceiling; `None` means unlimited.
    pub fn daily_limit(&self) -> Option<u32> {
        match self {
            Self::Unverified => Some(250),
            Self::Tier1 => Some(1_000),
            Self::Tier2 => Some(10_000),
            Self::Tier3 => Some(100_000),
            Self::Tier4 => None,
        }
    }

    /// Snake_case identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Tier1 => "tier1",
            Self::Tier2 => "tier2",
            Self::Tier3 => "tier3",
            Self::Tier4 => "tier4",
        }
    }
}

impl std::fmt::Display for MessagingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessagingTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "tier1" => Ok(Self::Tier1),
            "tier2" => Ok(Self::Tier2),
            "tier3" => Ok(Self::Tier3),
            "tier4" => Ok(Self::Tier4),
            other => Err(CoreError::UnknownValue(format!(
                "unknown messaging tier: {other:?}"
            ))),
        }
    }
}

// ─── Quality Rating ──────────────────────────────────────────────────

/// Provider-reported account health rating.
///
/// RED blocks the entire SENDING phase at the job level; it is never a
/// per-contact exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    /// Healthy account.
    Green,
    /// Degraded; sending continues with a warning.
    Yellow,
    /// Blocked; no marketing sends until the rating recovers.
    Red,
}

impl QualityRating {
    /// Whether this rating blocks the SENDING phase entirely.
    pub fn blocks_sending(&self) -> bool {
        matches!(self, Self::Red)
    }
}

impl std::fmt::Display for QualityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        };
        f.write_str(s)
    }
}

// ─── Send Category ───────────────────────────────────────────────────

/// The regulatory category of an outbound send, used by frequency caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendCategory {
    /// Marketing content — capped at 2 per rolling week.
    Marketing,
    /// Promotional content — capped at 1 per rolling week.
    Promotional,
    /// Transactional/service content — no per-category cap, but still
    /// counted against the combined ceiling.
    Transactional,
}

impl SendCategory {
    /// The per-category rolling 7-day cap; `None` means uncapped.
    pub fn weekly_cap(&self) -> Option<u32> {
        match self {
            Self::Marketing => Some(2),
            Self::Promotional => Some(1),
            Self::Transactional => None,
        }
    }

    /// The combined cap across capped categories per rolling week.
    pub const COMBINED_WEEKLY_CAP: u32 = 4;
}
