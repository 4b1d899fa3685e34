//! # Lifecycle Classification
//!
//! Stages a contact by recency of their last interaction:
//!
//! ```text
//! days since last interaction
//!   ≤7      New
//!   8–30    Engaged
//!   31–60   Active   (last interaction was contact-initiated)
//!           At-Risk  (otherwise)
//!   61–90   Dormant
//!   >90     Churned  (excluded from delivery)
//! ```
//!
//! The 31–60 band splits on who spoke last: a contact who wrote in
//! during the band is re-engageable (Active), one who only received is
//! drifting (At-Risk). A contact with no interaction history at all is
//! New: freshly uploaded, no signal either way yet.

use serde::{Deserialize, Serialize};

use bcast_core::Timestamp;

const SECS_PER_DAY: i64 = 86_400;

/// Engagement lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    /// Interacted within 7 days, or never (fresh upload).
    New,
    /// Interacted within 8–30 days.
    Engaged,
    /// 31–60 days, last interaction contact-initiated.
    Active,
    /// 31–60 days, outbound-only.
    AtRisk,
    /// 61–90 days.
    Dormant,
    /// Over 90 days; excluded from delivery.
    Churned,
}

impl LifecycleStage {
    /// Every stage, in band order.
    pub fn all() -> [Self; 6] {
        [
            Self::New,
            Self::Engaged,
            Self::Active,
            Self::AtRisk,
            Self::Dormant,
            Self::Churned,
        ]
    }

    /// Whether contacts in this stage receive deliveries.
    pub fn is_deliverable(&self) -> bool {
        !matches!(self, Self::Churned)
    }

    /// Snake_case identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Engaged => "engaged",
            Self::Active => "active",
            Self::AtRisk => "at_risk",
            Self::Dormant => "dormant",
            Self::Churned => "churned",
        }
    }
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interaction recency inputs for one contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactActivity {
    /// Most recent interaction in either direction.
    pub last_interaction_at: Option<Timestamp>,
    /// Most recent contact-initiated inbound message.
    pub last_inbound_at: Option<Timestamp>,
}

impl ContactActivity {
    /// Whole days since the last interaction, if any.
    pub fn days_since_interaction(&self, now: Timestamp) -> Option<u32> {
        self.last_interaction_at
            .map(|at| (now.secs_since(at).max(0) / SECS_PER_DAY) as u32)
    }

    /// Whether the contact wrote in within the last 24 hours.
    pub fn inbound_within_24h(&self, now: Timestamp) -> bool {
        self.last_inbound_at
            .map(|at| now.secs_since(at) < SECS_PER_DAY && now >= at)
            .unwrap_or(false)
    }
}

/// Classify a contact into its lifecycle stage.
pub fn classify(activity: &ContactActivity, now: Timestamp) -> LifecycleStage {
    let Some(days) = activity.days_since_interaction(now) else {
        return LifecycleStage::New;
    };
    match days {
        0..=7 => LifecycleStage::New,
        8..=30 => LifecycleStage::Engaged,
        31..=60 => {
            let inbound_in_band = activity
                .last_inbound_at
                .map(|at| (now.secs_since(at).max(0) / SECS_PER_DAY) as u32 <= 60)
                .unwrap_or(false);
            if inbound_in_band {
                LifecycleStage::Active
            } else {
                LifecycleStage::AtRisk
            }
        }
        61..=90 => LifecycleStage::Dormant,
        _ => LifecycleStage::Churned,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
