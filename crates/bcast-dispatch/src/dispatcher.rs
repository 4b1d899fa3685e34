//! # Tick-Driven Dispatcher
//!
//! Drains the priority queue through the gateway, one tick at a time.
//! A tick is handed the clock explicitly and dispatches whatever is due
//! at that instant: queued sends first, plus any retries whose
//! next-attempt instant has passed. Nothing in here sleeps or spawns.
//!
//! Tier budgets are hard ceilings. Exhausting the budget mid-drain
//! pauses the dispatcher with the machine-readable reason
//! [`TIER_LIMIT_EXHAUSTED`]; already-sent messages are untouched and
//! the queue keeps its order for resume.
//!
//! Send policy: the reduced-cost path is tried first. A non-retryable
//! rejection there falls back to the full path once, re-queued at the
//! front of its priority lane; a non-retryable rejection on the full
//! path is a permanent per-message failure. Retryable rejections and
//! timeouts go to the retry schedule until its offsets are exhausted.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bcast_core::{JobId, MessagingTier, Timestamp};

use crate::gateway::{ErrorClass, MessagingGateway, OutboundMessage};
use crate::queue::{PriorityQueue, QueuedSend};
use crate::retry::RetrySchedule;

/// Machine-readable pause reason for an exhausted tier budget.
pub const TIER_LIMIT_EXHAUSTED: &str = "tier_limit_exhausted";

// ─── Budget & Counters ───────────────────────────────────────────────

/// Sends consumed against the tier's per-period ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBudget {
    /// The account's messaging tier.
    pub tier: MessagingTier,
    /// Sends already counted in the current period.
    pub sent_in_period: u32,
}

impl TierBudget {
    /// A fresh budget for the tier.
    pub fn new(tier: MessagingTier) -> Self {
        Self {
            tier,
            sent_in_period: 0,
        }
    }

    /// Sends left in the period; `None` for an unlimited tier.
    pub fn remaining(&self) -> Option<u32> {
        self.tier
            .daily_limit()
            .map(|limit| limit.saturating_sub(self.sent_in_period))
    }

    /// Whether at least one more send fits.
    pub fn has_capacity(&self) -> bool {
        self.remaining().map_or(true, |r| r > 0)
    }

    /// Count one accepted send.
    pub fn record_sent(&mut self) {
        self.sent_in_period += 1;
    }

    /// Start a new period.
    pub fn reset_period(&mut self) {
        self.sent_in_period = 0;
    }
}

/// Lifetime counters for one dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounters {
    /// Gateway send attempts.
    pub attempted: u32,
    /// Accepted sends.
    pub sent: u32,
    /// Retries placed on the schedule.
    pub retries_scheduled: u32,
    /// Reduced-cost to full-path fallbacks.
    pub fallbacks: u32,
    /// Messages failed permanently.
    pub permanent_failures: u32,
}

// ─── State ───────────────────────────────────────────────────────────

/// Dispatcher lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatchState {
    /// Ticks dispatch.
    Running,
    /// Ticks are no-ops until resume.
    Paused {
        /// Machine-readable pause reason.
        reason: String,
    },
    /// Terminal; nothing further dispatches.
    Cancelled,
    /// Terminal; queue and schedule drained.
    Completed,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Gateway send attempts this tick.
    pub attempted: u32,
    /// Accepted sends this tick.
    pub sent: u32,
    /// Retries scheduled this tick.
    pub retries_scheduled: u32,
    /// Permanent failures this tick.
    pub permanent_failures: u32,
    /// Set when this tick paused the dispatcher.
    pub paused_reason: Option<String>,
    /// Set when this tick drained the last item.
    pub completed: bool,
}

// ─── Snapshot ────────────────────────────────────────────────────────

/// Serialized dispatcher state. Restoring reproduces queue contents,
/// order, counters, budget, and retry timers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSnapshot {
    /// Owning job.
    pub job_id: JobId,
    /// Queue contents in dequeue order.
    pub queue: PriorityQueue,
    /// Pending retries with absolute instants.
    pub retry: RetrySchedule,
    /// Tier budget, including period consumption.
    pub budget: TierBudget,
    /// Lifetime counters.
    pub counters: DispatchCounters,
    /// Lifecycle state.
    pub state: DispatchState,
    /// Concurrent-request budget per tick.
    pub max_in_flight: u32,
}

// ─── Dispatcher ──────────────────────────────────────────────────────

/// The per-job dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    job_id: JobId,
    queue: PriorityQueue,
    retry: RetrySchedule,
    budget: TierBudget,
    counters: DispatchCounters,
    state: DispatchState,
    max_in_flight: u32,
}

impl Dispatcher {
    /// Create a running dispatcher with an empty queue.
    pub fn new(job_id: JobId, tier: MessagingTier, max_in_flight: u32) -> Self {
        Self {
            job_id,
            queue: PriorityQueue::new(),
            retry: RetrySchedule::new(),
            budget: TierBudget::new(tier),
            counters: DispatchCounters::default(),
            state: DispatchState::Running,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Enqueue a send.
    pub fn enqueue(&mut self, item: QueuedSend) {
        self.queue.push(item);
    }

    /// Lifecycle state.
    pub fn state(&self) -> &DispatchState {
        &self.state
    }

    /// Lifetime counters.
    pub fn counters(&self) -> DispatchCounters {
        self.counters
    }

    /// Tier budget.
    pub fn budget(&self) -> TierBudget {
        self.budget
    }

    /// Queued sends not yet attempted.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Pending retries.
    pub fn pending_retries(&self) -> usize {
        self.retry.len()
    }

    /// Earliest instant at which a future tick has retry work.
    pub fn next_due_at(&self) -> Option<Timestamp> {
        self.retry.next_due_at()
    }

    /// Dispatch everything due at `now`, bounded by the in-flight
    /// budget and the tier ceiling.
    pub fn tick<G: MessagingGateway>(&mut self, now: Timestamp, gateway: &mut G) -> TickReport {
        let mut report = TickReport::default();
        if self.state != DispatchState::Running {
            return report;
        }

        for item in self.retry.take_due(now) {
            self.queue.push(item);
        }

        let mut in_flight = 0;
        while in_flight < self.max_in_flight {
            if !self.budget.has_capacity() {
                if !self.queue.is_empty() || !self.retry.is_empty() {
                    warn!(
                        job_id = %self.job_id,
                        sent_in_period = self.budget.sent_in_period,
                        "tier budget exhausted, pausing dispatch"
                    );
                    self.state = DispatchState::Paused {
                        reason: TIER_LIMIT_EXHAUSTED.to_string(),
                    };
                    report.paused_reason = Some(TIER_LIMIT_EXHAUSTED.to_string());
                }
                break;
            }
            let Some(item) = self.queue.pop() else {
                break;
            };
            in_flight += 1;
            self.attempt(item, now, gateway, &mut report);
        }

        if self.state == DispatchState::Running
            && self.queue.is_empty()
            && self.retry.is_empty()
        {
            self.state = DispatchState::Completed;
            report.completed = true;
            info!(job_id = %self.job_id, sent = self.counters.sent, "dispatch drained");
        }
        report
    }

    fn attempt<G: MessagingGateway>(
        &mut self,
        mut item: QueuedSend,
        now: Timestamp,
        gateway: &mut G,
        report: &mut TickReport,
    ) {
        let message = OutboundMessage {
            contact_id: item.contact_id,
            phone: item.phone.clone(),
            template_id: item.template_id,
        };
        item.attempts += 1;
        self.counters.attempted += 1;
        report.attempted += 1;

        let result = if item.full_path_only {
            gateway.send_full(&message)
        } else {
            gateway.send_reduced_cost(&message)
        };
        match result {
            Ok(receipt) => {
                debug!(
                    contact_id = %item.contact_id,
                    provider_message_id = %receipt.provider_message_id,
                    "send accepted"
                );
                self.counters.sent += 1;
                report.sent += 1;
                self.budget.record_sent();
            }
            Err(err) => match err.class() {
                ErrorClass::Retryable => {
                    if self.retry.schedule(item, now) {
                        self.counters.retries_scheduled += 1;
                        report.retries_scheduled += 1;
                    } else {
                        self.counters.permanent_failures += 1;
                        report.permanent_failures += 1;
                    }
                }
                ErrorClass::NonRetryable => {
                    if item.full_path_only {
                        self.counters.permanent_failures += 1;
                        report.permanent_failures += 1;
                    } else {
                        // One fallback: retry on the full path ahead of
                        // its FIFO peers.
                        item.full_path_only = true;
                        self.counters.fallbacks += 1;
                        self.queue.push_front(item);
                    }
                }
            },
        }
    }

    /// Pause dispatch. No-op unless running.
    pub fn pause(&mut self, reason: impl Into<String>) {
        if self.state == DispatchState::Running {
            self.state = DispatchState::Paused {
                reason: reason.into(),
            };
        }
    }

    /// Resume a paused dispatcher.
    pub fn resume(&mut self) {
        if matches!(self.state, DispatchState::Paused { .. }) {
            self.state = DispatchState::Running;
        }
    }

    /// Stop dispatching permanently. Queued and scheduled work stays in
    /// place for inspection but will never be attempted.
    pub fn cancel(&mut self) {
        if !matches!(self.state, DispatchState::Completed) {
            self.state = DispatchState::Cancelled;
        }
    }

    /// Start a new tier period.
    pub fn reset_period(&mut self) {
        self.budget.reset_period();
    }

    /// Freeze the dispatcher for persistence.
    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            job_id: self.job_id,
            queue: self.queue.clone(),
            retry: self.retry.clone(),
            budget: self.budget,
            counters: self.counters,
            state: self.state.clone(),
            max_in_flight: self.max_in_flight,
        }
    }

    /// Rebuild a dispatcher from a snapshot, verbatim.
    pub fn from_snapshot(snapshot: DispatcherSnapshot) -> Self {
        Self {
            job_id: snapshot.job_id,
            queue: snapshot.queue,
            retry: snapshot.retry,
            budget: snapshot.budget,
            counters: snapshot.counters,
            state: snapshot.state,
            max_in_flight: snapshot.max_in_flight.max(1),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
