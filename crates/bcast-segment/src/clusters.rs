//! # Timezone Clustering
//!
//! Groups contacts by their country's fixed UTC offset so each cluster
//! can be dispatched inside the 10:00–14:00 local optimal band. Also
//! hosts the 24-hour free-window constant shared with lifecycle
//! detection: a contact who wrote in within the last day is eligible
//! for reduced-cost delivery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use bcast_core::{ContactId, CountryCode, Timestamp};

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;

/// Width of the reduced-cost delivery window after an inbound message.
pub const FREE_WINDOW_SECS: i64 = SECS_PER_DAY;

const BAND_START_HOUR: i64 = 10;
const BAND_END_HOUR: i64 = 14;

/// Contacts sharing one UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneCluster {
    /// UTC offset in minutes.
    pub offset_minutes: i32,
    /// Member contacts, in input order.
    pub contact_ids: Vec<ContactId>,
    /// UTC instant at which the cluster's optimal band is (next) open.
    pub band_opens_at: Timestamp,
}

impl TimezoneCluster {
    /// Cluster contacts by country offset, ascending by offset.
    pub fn build(contacts: &[(ContactId, CountryCode)], now: Timestamp) -> Vec<Self> {
        let mut by_offset: BTreeMap<i32, Vec<ContactId>> = BTreeMap::new();
        for (id, country) in contacts {
            by_offset
                .entry(country.utc_offset_minutes())
                .or_default()
                .push(*id);
        }
        by_offset
            .into_iter()
            .map(|(offset_minutes, contact_ids)| Self {
                offset_minutes,
                contact_ids,
                band_opens_at: next_optimal_band(offset_minutes, now),
            })
            .collect()
    }
}

/// UTC instant at which the 10:00–14:00 local band is next open for
/// the given offset. If `now` is already inside the band, `now`.
pub fn next_optimal_band(offset_minutes: i32, now: Timestamp) -> Timestamp {
    let offset_secs = i64::from(offset_minutes) * 60;
    let local = (now.epoch_secs() + offset_secs).rem_euclid(SECS_PER_DAY);
    let start = BAND_START_HOUR * SECS_PER_HOUR;
    let end = BAND_END_HOUR * SECS_PER_HOUR;
    if (start..end).contains(&local) {
        now
    } else if local < start {
        now.plus_secs(start - local)
    } else {
        now.plus_secs(SECS_PER_DAY - local + start)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
