//! # Retry Schedule
//!
//! Failed sends re-enter dispatch through a persisted schedule of
//! absolute next-attempt instants, never through in-process timers. The
//! offsets after each failed attempt are immediate, +30s, +2m, +10m,
//! +1h; a failure after the last offset is permanent.

use serde::{Deserialize, Serialize};

use bcast_core::Timestamp;

use crate::queue::QueuedSend;

/// Retry offsets in seconds, indexed by attempts already made minus one.
pub const RETRY_OFFSETS_SECS: [i64; 5] = [0, 30, 120, 600, 3_600];

/// The offset before the next attempt, given attempts already made.
/// `None` once the schedule is exhausted.
pub fn retry_offset(attempts_made: u32) -> Option<i64> {
    if attempts_made == 0 {
        // The first attempt is not a retry.
        return Some(0);
    }
    RETRY_OFFSETS_SECS
        .get(attempts_made as usize - 1)
        .copied()
}

/// One scheduled retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEntry {
    /// The send to re-attempt, with its attempt count.
    pub item: QueuedSend,
    /// Absolute instant of the next attempt.
    pub next_attempt_at: Timestamp,
}

/// The persisted retry schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySchedule {
    entries: Vec<RetryEntry>,
}

impl RetrySchedule {
    /// Create an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule the next attempt for a failed send whose attempt count
    /// has already been bumped. Returns `false` when the schedule is
    /// exhausted and the failure is permanent.
    pub fn schedule(&mut self, item: QueuedSend, now: Timestamp) -> bool {
        match retry_offset(item.attempts) {
            Some(offset) => {
                self.entries.push(RetryEntry {
                    next_attempt_at: now.plus_secs(offset),
                    item,
                });
                true
            }
            None => false,
        }
    }

    /// Drain every entry due at `now`, preserving schedule order.
    pub fn take_due(&mut self, now: Timestamp) -> Vec<QueuedSend> {
        let mut due = Vec::new();
        self.entries.retain(|entry| {
            if entry.next_attempt_at <= now {
                due.push(entry.item.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// Earliest scheduled instant, if anything is pending.
    pub fn next_due_at(&self) -> Option<Timestamp> {
        self.entries.iter().map(|e| e.next_attempt_at).min()
    }

    /// Pending retries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scheduled entries, in schedule order.
    pub fn entries(&self) -> &[RetryEntry] {
        &self.entries
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
