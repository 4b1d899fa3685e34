//! # Frequency Caps
//!
//! Rolling 7-day send caps per contact: at most 2 marketing sends, 1
//! promotional send, and 4 sends combined. Transactional sends are
//! uncapped individually but count toward the combined ceiling. An
//! at-cap contact is excluded from the segment regardless of other
//! eligibility.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use bcast_core::{PhoneE164, SendCategory, Timestamp};

/// Width of the rolling window.
pub const ROLLING_WINDOW_SECS: i64 = 7 * 86_400;

/// One recorded send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRecord {
    /// What category was sent.
    pub category: SendCategory,
    /// When it was sent.
    pub at: Timestamp,
}

/// Outcome of a cap check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapCheck {
    /// Under every applicable cap.
    Allowed,
    /// The per-category cap is exhausted.
    CategoryCapReached,
    /// The combined cap is exhausted.
    CombinedCapReached,
}

/// Per-contact send history with rolling-window counting.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FrequencyLedger {
    sends: HashMap<PhoneE164, Vec<SendRecord>>,
}

impl FrequencyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed send.
    pub fn record(&mut self, phone: &PhoneE164, category: SendCategory, at: Timestamp) {
        self.sends
            .entry(phone.clone())
            .or_default()
            .push(SendRecord { category, at });
    }

    /// Sends to `phone` within the rolling window ending at `now`,
    /// optionally restricted to one category.
    pub fn count_in_window(
        &self,
        phone: &PhoneE164,
        category: Option<SendCategory>,
        now: Timestamp,
    ) -> u32 {
        let cutoff = now.plus_secs(-ROLLING_WINDOW_SECS);
        self.sends
            .get(phone)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.at > cutoff && r.at <= now)
                    .filter(|r| category.map_or(true, |c| r.category == c))
                    .count() as u32
            })
            .unwrap_or(0)
    }

    /// Check whether one more `category` send to `phone` fits the caps.
    pub fn check(&self, phone: &PhoneE164, category: SendCategory, now: Timestamp) -> CapCheck {
        if let Some(cap) = category.weekly_cap() {
            if self.count_in_window(phone, Some(category), now) >= cap {
                return CapCheck::CategoryCapReached;
            }
        }
        if self.count_in_window(phone, None, now) >= SendCategory::COMBINED_WEEKLY_CAP {
            return CapCheck::CombinedCapReached;
        }
        CapCheck::Allowed
    }

    /// Drop records older than the rolling window.
    pub fn prune(&mut self, now: Timestamp) {
        let cutoff = now.plus_secs(-ROLLING_WINDOW_SECS);
        self.sends.retain(|_, records| {
            records.retain(|r| r.at > cutoff);
            !records.is_empty()
        });
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneE164 {
        PhoneE164::parse("+919876543210").unwrap()
    }

    fn at(iso: &str) -> Timestamp {
        Timestamp::parse(iso).unwrap()
    }

    #[test]
    fn test_marketing_cap_is_two_per_week() {
        let mut ledger = FrequencyLedger::new();
        let now = at("2026-03-07T12:00:00Z");
        ledger.record(&phone(), SendCategory::Marketing, at("2026-03-02T12:00:00Z"));
        assert_eq!(ledger.check(&phone(), SendCategory::Marketing, now), CapCheck::Allowed);
        ledger.record(&phone(), SendCategory::Marketing, at("2026-03-04T12:00:00Z"));
        assert_eq!(
            ledger.check(&phone(), SendCategory::Marketing, now),
            CapCheck::CategoryCapReached
        );
    }

    #[test]
    fn test_promotional_cap_is_one_per_week() {
        let mut ledger = FrequencyLedger::new();
        let now = at("2026-03-07T12:00:00Z");
        ledger.record(&phone(), SendCategory::Promotional, at("2026-03-02T12:00:00Z"));
        assert_eq!(
            ledger.check(&phone(), SendCategory::Promotional, now),
            CapCheck::CategoryCapReached
        );
    }

    #[test]
    fn test_combined_cap_catches_transactional_volume() {
        let mut ledger = FrequencyLedger::new();
        let now = at("2026-03-07T12:00:00Z");
        for day in 1..=4 {
            ledger.record(
                &phone(),
                SendCategory::Transactional,
                at(&format!("2026-03-0{day}T12:00:00Z")),
            );
        }
        // Transactional itself has no per-category cap.
        assert_eq!(
            ledger.check(&phone(), SendCategory::Transactional, now),
            CapCheck::CombinedCapReached
        );
        assert_eq!(
            ledger.check(&phone(), SendCategory::Marketing, now),
            CapCheck::CombinedCapReached
        );
    }

    #[test]
    fn test_window_rolls_off() {
        let mut ledger = FrequencyLedger::new();
        ledger.record(&phone(), SendCategory::Promotional, at("2026-03-01T12:00:00Z"));
        // Exactly 7 days later the record has rolled out of the window.
        let now = at("2026-03-08T12:00:00Z");
        assert_eq!(
            ledger.check(&phone(), SendCategory::Promotional, now),
            CapCheck::Allowed
        );
    }

    #[test]
    fn test_prune_drops_only_stale_records() {
        let mut ledger = FrequencyLedger::new();
        ledger.record(&phone(), SendCategory::Marketing, at("2026-02-01T12:00:00Z"));
        ledger.record(&phone(), SendCategory::Marketing, at("2026-03-06T12:00:00Z"));
        let now = at("2026-03-07T12:00:00Z");
        ledger.prune(now);
        assert_eq!(ledger.count_in_window(&phone(), None, now), 1);
    }

    #[test]
    fn test_unknown_contact_is_allowed() {
        let ledger = FrequencyLedger::new();
        assert_eq!(
            ledger.check(&phone(), SendCategory::Marketing, at("2026-03-07T12:00:00Z")),
            CapCheck::Allowed
        );
    }
}
