//! # BroadcastJob Aggregate
//!
//! The job row the orchestration engine owns exclusively: phase, counters,
//! summaries, and the per-transition audit log. The only way to change the
//! phase is [`BroadcastJob::transition`], which validates the request
//! against the allowed-transition table and rejects everything else with
//! the job state unchanged.
//!
//! ## Invariants
//!
//! - Every committed transition is an edge in the phase table.
//! - Contact and delivery counters never decrease, except that `pending`
//!   drains into `sent`/`failed` during retry reconciliation.
//! - A job that is blocked or paused always carries a machine-readable
//!   [`StatusReason`] — a job never silently stalls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bcast_core::{JobId, TemplateId, Timestamp};

use crate::phase::BroadcastPhase;

// ─── Status Reasons ──────────────────────────────────────────────────

/// Machine-readable reason attached to every phase transition.
///
/// The snake_case form is what lands in the persisted `status_reason`
/// column and in operator tooling, so the set is closed and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusReason {
    /// A phase handler finished and requested the next phase.
    PhaseComplete,
    /// Contact ingestion produced zero valid contacts.
    NoValidContacts,
    /// The compliance gate failed the job (hard failure).
    ComplianceFailed,
    /// Only the time-window check blocked; resolvable by scheduling.
    ScheduleRequired,
    /// Template submitted to the provider, awaiting approval.
    TemplateSubmitted,
    /// Template approved by the provider.
    TemplateApproved,
    /// Template rejected; content needs rework.
    TemplateRejected,
    /// Caller-requested pause.
    UserPause,
    /// Caller-requested resume.
    UserResume,
    /// Caller-requested cancellation.
    UserCancel,
    /// The account's tier ceiling was reached mid-dispatch.
    TierLimitExhausted,
    /// Provider reported a RED account health rating.
    AccountHealthRed,
    /// All queue entries resolved (sent or permanently failed).
    DeliveryComplete,
    /// An unrecoverable provider or infrastructure failure.
    ProviderFailure,
}

impl StatusReason {
    /// Snake_case identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhaseComplete => "phase_complete",
            Self::NoValidContacts => "no_valid_contacts",
            Self::ComplianceFailed => "compliance_failed",
            Self::ScheduleRequired => "schedule_required",
            Self::TemplateSubmitted => "template_submitted",
            Self::TemplateApproved => "template_approved",
            Self::TemplateRejected => "template_rejected",
            Self::UserPause => "user_pause",
            Self::UserResume => "user_resume",
            Self::UserCancel => "user_cancel",
            Self::TierLimitExhausted => "tier_limit_exhausted",
            Self::AccountHealthRed => "account_health_red",
            Self::DeliveryComplete => "delivery_complete",
            Self::ProviderFailure => "provider_failure",
        }
    }
}

impl std::fmt::Display for StatusReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Counters ────────────────────────────────────────────────────────

/// Aggregate contact counts from the ingestion phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCounts {
    /// Contacts in the uploaded batch.
    pub total: u32,
    /// Contacts that passed normalization (duplicates included).
    pub valid: u32,
    /// Contacts rejected as malformed.
    pub invalid: u32,
}

/// Delivery progress counters, mutated only by this job's dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounters {
    /// Accepted by the gateway.
    pub sent: u32,
    /// Confirmed delivered by the gateway.
    pub delivered: u32,
    /// Permanently failed (terminal code or retries exhausted).
    pub failed: u32,
    /// Queued or mid-backoff.
    pub pending: u32,
}

impl DeliveryCounters {
    /// Record a gateway acceptance: one pending entry becomes sent.
    pub fn record_sent(&mut self) {
        self.sent += 1;
        self.pending = self.pending.saturating_sub(1);
    }

    /// Record a delivery confirmation for an already-sent message.
    pub fn record_delivered(&mut self) {
        self.delivered += 1;
    }

    /// Record a permanent failure: one pending entry becomes failed.
    pub fn record_failed(&mut self) {
        self.failed += 1;
        self.pending = self.pending.saturating_sub(1);
    }
}

// ─── Transition Record ───────────────────────────────────────────────

/// Record of a single phase transition, kept as an ordered audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransitionRecord {
    /// Phase before the transition.
    pub from_phase: BroadcastPhase,
    /// Phase after the transition.
    pub to_phase: BroadcastPhase,
    /// When the transition was committed.
    pub timestamp: Timestamp,
    /// Why the transition happened.
    pub reason: StatusReason,
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by job phase transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The requested transition is not an edge in the phase table.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase.
        from: BroadcastPhase,
        /// Requested target phase.
        to: BroadcastPhase,
    },

    /// The job is in a terminal phase and cannot transition at all.
    #[error("job {job_id} is terminal in phase {phase}")]
    TerminalPhase {
        /// The job identifier.
        job_id: JobId,
        /// The terminal phase.
        phase: BroadcastPhase,
    },
}

// ─── BroadcastJob ────────────────────────────────────────────────────

/// A broadcast campaign run and its full lifecycle state.
///
/// Created at campaign initiation in `INITIALIZED`; advanced phase by
/// phase by the orchestration engine; destroyed only by explicit deletion
/// outside this crate's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastJob {
    /// Unique job identifier.
    pub id: JobId,
    /// Owning user.
    pub user_id: String,
    /// Owning project.
    pub project_id: String,

    /// Current phase.
    pub phase: BroadcastPhase,
    /// Phase before the most recent transition.
    pub previous_phase: Option<BroadcastPhase>,
    /// Reason for the most recent transition.
    pub status_reason: Option<StatusReason>,

    /// Contact ingestion counts.
    pub contacts: ContactCounts,
    /// Compliance verdict summary, if the gate has run ("passed",
    /// "schedule_required", "failed").
    pub compliance_status: Option<String>,
    /// Segment summary blob, persisted as JSON at the storage boundary.
    pub segment_summary: Option<serde_json::Value>,
    /// The selected template, once content creation has run.
    pub template_id: Option<TemplateId>,

    /// Delivery progress.
    pub delivery: DeliveryCounters,
    /// Human-readable error detail for FAILED jobs.
    pub error_message: Option<String>,

    /// When the job was created.
    pub created_at: Timestamp,
    /// When the job last changed.
    pub updated_at: Timestamp,
    /// First entry into SENDING.
    pub started_sending_at: Option<Timestamp>,
    /// Entry into a terminal phase.
    pub completed_at: Option<Timestamp>,

    /// Ordered log of all phase transitions.
    pub transitions: Vec<PhaseTransitionRecord>,
}

impl BroadcastJob {
    /// Create a new job in `INITIALIZED`.
    pub fn new(id: JobId, user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            user_id: user_id.into(),
            project_id: project_id.into(),
            phase: BroadcastPhase::Initialized,
            previous_phase: None,
            status_reason: None,
            contacts: ContactCounts::default(),
            compliance_status: None,
            segment_summary: None,
            template_id: None,
            delivery: DeliveryCounters::default(),
            error_message: None,
            created_at: now,
            updated_at: now,
            started_sending_at: None,
            completed_at: None,
            transitions: Vec::new(),
        }
    }

    /// Request a phase transition.
    ///
    /// Validates the request against the allowed-transition table. On
    /// success the audit log gains an entry, `previous_phase` and
    /// `status_reason` are updated, and phase-entry timestamps are
    /// stamped (`started_sending_at` on first SENDING entry,
    /// `completed_at` on terminal entry).
    ///
    /// # Errors
    ///
    /// [`JobError::TerminalPhase`] if the job is already terminal,
    /// [`JobError::InvalidTransition`] for any edge the table lacks.
    /// Either way the job is unchanged.
    pub fn transition(
        &mut self,
        to: BroadcastPhase,
        reason: StatusReason,
    ) -> Result<(), JobError> {
        if self.phase.is_terminal() {
            return Err(JobError::TerminalPhase {
                job_id: self.id,
                phase: self.phase,
            });
        }
        if !self.phase.can_transition_to(to) {
            return Err(JobError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        let now = Timestamp::now();
        self.transitions.push(PhaseTransitionRecord {
            from_phase: self.phase,
            to_phase: to,
            timestamp: now,
            reason,
        });
        self.previous_phase = Some(self.phase);
        self.phase = to;
        self.status_reason = Some(reason);
        self.updated_at = now;

        if to == BroadcastPhase::Sending && self.started_sending_at.is_none() {
            self.started_sending_at = Some(now);
        }
        if to.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Record contact ingestion counts (DATA_PROCESSING output).
    pub fn record_contact_counts(&mut self, counts: ContactCounts) {
        self.contacts = counts;
        self.updated_at = Timestamp::now();
    }

    /// Whether the job is in a terminal phase.
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_job() -> BroadcastJob {
        BroadcastJob::new(JobId::new(), "user-1", "project-1")
    }

    /// Drive a job to READY_TO_SEND along the no-approval path.
    fn make_ready_job() -> BroadcastJob {
        let mut job = make_job();
        for phase in [
            BroadcastPhase::DataProcessing,
            BroadcastPhase::ComplianceCheck,
            BroadcastPhase::Segmentation,
            BroadcastPhase::ContentCreation,
            BroadcastPhase::ReadyToSend,
        ] {
            job.transition(phase, StatusReason::PhaseComplete).unwrap();
        }
        job
    }

    #[test]
    fn test_new_job_is_initialized() {
        let job = make_job();
        assert_eq!(job.phase, BroadcastPhase::Initialized);
        assert!(job.previous_phase.is_none());
        assert!(job.transitions.is_empty());
    }

    #[test]
    fn test_happy_path_to_completed() {
        let mut job = make_ready_job();
        job.transition(BroadcastPhase::Sending, StatusReason::PhaseComplete)
            .unwrap();
        job.transition(BroadcastPhase::Completed, StatusReason::DeliveryComplete)
            .unwrap();
        assert!(job.is_terminal());
        assert_eq!(job.transitions.len(), 7);
        assert!(job.started_sending_at.is_some());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_approval_path() {
        let mut job = make_job();
        for phase in [
            BroadcastPhase::DataProcessing,
            BroadcastPhase::ComplianceCheck,
            BroadcastPhase::Segmentation,
            BroadcastPhase::ContentCreation,
        ] {
            job.transition(phase, StatusReason::PhaseComplete).unwrap();
        }
        job.transition(BroadcastPhase::PendingApproval, StatusReason::TemplateSubmitted)
            .unwrap();
        job.transition(BroadcastPhase::ReadyToSend, StatusReason::TemplateApproved)
            .unwrap();
        assert_eq!(job.phase, BroadcastPhase::ReadyToSend);
    }

    #[test]
    fn test_rejected_template_returns_to_content_creation() {
        let mut job = make_job();
        for phase in [
            BroadcastPhase::DataProcessing,
            BroadcastPhase::ComplianceCheck,
            BroadcastPhase::Segmentation,
            BroadcastPhase::ContentCreation,
            BroadcastPhase::PendingApproval,
        ] {
            job.transition(phase, StatusReason::PhaseComplete).unwrap();
        }
        job.transition(BroadcastPhase::ContentCreation, StatusReason::TemplateRejected)
            .unwrap();
        assert_eq!(job.phase, BroadcastPhase::ContentCreation);
        assert_eq!(job.status_reason, Some(StatusReason::TemplateRejected));
    }

    #[test]
    fn test_invalid_transition_leaves_state_unchanged() {
        let mut job = make_job();
        let before = job.phase;
        let result = job.transition(BroadcastPhase::Sending, StatusReason::PhaseComplete);
        assert_eq!(
            result.unwrap_err(),
            JobError::InvalidTransition {
                from: BroadcastPhase::Initialized,
                to: BroadcastPhase::Sending,
            }
        );
        assert_eq!(job.phase, before);
        assert!(job.transitions.is_empty());
        assert!(job.status_reason.is_none());
    }

    #[test]
    fn test_terminal_job_rejects_all_transitions() {
        let mut job = make_ready_job();
        job.transition(BroadcastPhase::Cancelled, StatusReason::UserCancel)
            .unwrap();
        let result = job.transition(BroadcastPhase::Sending, StatusReason::UserResume);
        assert!(matches!(result, Err(JobError::TerminalPhase { .. })));
    }

    #[test]
    fn test_pause_resume_keeps_started_sending_at() {
        let mut job = make_ready_job();
        job.transition(BroadcastPhase::Sending, StatusReason::PhaseComplete)
            .unwrap();
        let started = job.started_sending_at;
        assert!(started.is_some());
        job.transition(BroadcastPhase::Paused, StatusReason::TierLimitExhausted)
            .unwrap();
        assert_eq!(job.status_reason, Some(StatusReason::TierLimitExhausted));
        job.transition(BroadcastPhase::Sending, StatusReason::UserResume)
            .unwrap();
        // First-entry timestamp survives the pause round trip.
        assert_eq!(job.started_sending_at, started);
    }

    #[test]
    fn test_previous_phase_tracking() {
        let mut job = make_job();
        job.transition(BroadcastPhase::DataProcessing, StatusReason::PhaseComplete)
            .unwrap();
        assert_eq!(job.previous_phase, Some(BroadcastPhase::Initialized));
        job.transition(BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete)
            .unwrap();
        assert_eq!(job.previous_phase, Some(BroadcastPhase::DataProcessing));
    }

    #[test]
    fn test_audit_log_records_every_transition() {
        let job = make_ready_job();
        assert_eq!(job.transitions.len(), 5);
        assert_eq!(job.transitions[0].from_phase, BroadcastPhase::Initialized);
        assert_eq!(
            job.transitions.last().unwrap().to_phase,
            BroadcastPhase::ReadyToSend
        );
        // The log chains: each record's from is the previous record's to.
        for pair in job.transitions.windows(2) {
            assert_eq!(pair[0].to_phase, pair[1].from_phase);
        }
    }

    #[test]
    fn test_delivery_counters_drain_pending() {
        let mut c = DeliveryCounters {
            pending: 3,
            ..Default::default()
        };
        c.record_sent();
        c.record_failed();
        assert_eq!(c.sent, 1);
        assert_eq!(c.failed, 1);
        assert_eq!(c.pending, 1);
        c.record_delivered();
        assert_eq!(c.delivered, 1);
    }

    #[test]
    fn test_status_reason_strings() {
        assert_eq!(StatusReason::TierLimitExhausted.as_str(), "tier_limit_exhausted");
        assert_eq!(StatusReason::AccountHealthRed.as_str(), "account_health_red");
        assert_eq!(StatusReason::ScheduleRequired.as_str(), "schedule_required");
    }

    #[test]
    fn test_job_serialization() {
        let job = make_ready_job();
        let json = serde_json::to_string(&job).unwrap();
        let parsed: BroadcastJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.phase, job.phase);
        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.transitions.len(), job.transitions.len());
    }
}
