//! # Send-Time Windows
//!
//! Regulatory quiet hours by locale: sends are permitted 09:00–21:00
//! local time in most supported locales, 09:00–22:00 in the UAE. A
//! contact outside the window is deferred to the next window start in
//! their locale, never excluded.
//!
//! Local time is resolved from the country's fixed UTC offset. Half-hour
//! offsets (India at UTC+05:30) are handled by doing the arithmetic in
//! seconds rather than whole hours.

use serde::{Deserialize, Serialize};

use bcast_core::{CountryCode, Timestamp};

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;

/// Outcome of a send-window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowCheck {
    /// Inside the locale window; send now.
    InWindow,
    /// Outside the window; hold until `resume_at`.
    Deferred {
        /// UTC instant of the next window start in the contact's locale.
        resume_at: Timestamp,
    },
}

impl WindowCheck {
    /// Check whether `now` falls inside the country's send window.
    pub fn evaluate(country: CountryCode, now: Timestamp) -> Self {
        let (start_hour, end_hour) = country.send_window_hours();
        let local = local_day_secs(country, now);
        let start = i64::from(start_hour) * SECS_PER_HOUR;
        let end = i64::from(end_hour) * SECS_PER_HOUR;
        if (start..end).contains(&local) {
            Self::InWindow
        } else {
            Self::Deferred {
                resume_at: next_window_start(country, now),
            }
        }
    }
}

/// UTC instant of the next send-window start in the country's locale.
///
/// If the window has not opened yet today (local time), that opening;
/// otherwise tomorrow's.
pub fn next_window_start(country: CountryCode, now: Timestamp) -> Timestamp {
    let (start_hour, _) = country.send_window_hours();
    let local = local_day_secs(country, now);
    let start = i64::from(start_hour) * SECS_PER_HOUR;
    let delta = if local < start {
        start - local
    } else {
        SECS_PER_DAY - local + start
    };
    now.plus_secs(delta)
}

/// Seconds since local midnight in the country's fixed offset.
fn local_day_secs(country: CountryCode, now: Timestamp) -> i64 {
    let offset_secs = i64::from(country.utc_offset_minutes()) * 60;
    (now.epoch_secs() + offset_secs).rem_euclid(SECS_PER_DAY)
}

// ─── Tests ───────────────────────────────────────────────────────────
