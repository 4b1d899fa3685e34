//! # The Compliance Gate
//!
//! The COMPLIANCE_CHECK phase evaluator. Per contact, four checks run
//! in order and short-circuit at the first hit:
//!
//! 1. Consent — latest event must be an opt-in.
//! 2. Suppression — no active entry for this job.
//! 3. Send window — inside the locale window, else deferred.
//! 4. Account health — job-level: RED fails the whole job.
//!
//! Exclusion is an outcome, never an error: excluded contacts are
//! bucketed by reason, deferred contacts carry their resume instant,
//! and the job-level verdict summarizes the three ways a check phase
//! can end.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bcast_contacts::ProcessedContact;
use bcast_core::{ContactId, JobId, MessagingTier, QualityRating, SendCategory, Timestamp};

use crate::consent::{ConsentState, ConsentStore};
use crate::suppression::{SuppressionScope, SuppressionStore};
use crate::window::WindowCheck;

// ─── Account Health ──────────────────────────────────────────────────

/// Provider-reported account standing, consulted job-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHealth {
    /// Provider quality rating.
    pub rating: QualityRating,
    /// Messaging tier, for capacity warnings.
    pub tier: MessagingTier,
}

// ─── Outcome ─────────────────────────────────────────────────────────

/// Job-level verdict of a compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceVerdict {
    /// At least one contact is eligible now.
    Passed,
    /// Nothing eligible now, but deferred contacts will be once their
    /// locale window opens.
    ScheduleRequired,
    /// Nothing eligible and nothing deferred, or account health blocks
    /// the job outright.
    Failed,
}

impl ComplianceVerdict {
    /// SCREAMING_SNAKE identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::ScheduleRequired => "SCHEDULE_REQUIRED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ComplianceVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact held until its locale send window opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deferral {
    /// The deferred contact.
    pub contact_id: ContactId,
    /// UTC instant of the next window start.
    pub resume_at: Timestamp,
}

/// Exclusions bucketed by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCounts {
    /// No consent event on record.
    pub no_consent: u32,
    /// Latest consent event is an opt-out.
    pub opted_out: u32,
    /// Active global suppression entry.
    pub suppressed_global: u32,
    /// Active suppression entry scoped to this job.
    pub suppressed_campaign: u32,
    /// Active temporary suppression entry.
    pub suppressed_temporary: u32,
    /// Active bounce suppression entry.
    pub suppressed_bounce: u32,
}

impl ExclusionCounts {
    /// Total excluded contacts across all buckets.
    pub fn total(&self) -> u32 {
        self.no_consent
            + self.opted_out
            + self.suppressed_global
            + self.suppressed_campaign
            + self.suppressed_temporary
            + self.suppressed_bounce
    }
}

/// Full result of a compliance check, persisted into the job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceOutcome {
    /// Job-level verdict.
    pub verdict: ComplianceVerdict,
    /// Contacts eligible for dispatch now, in input order.
    pub eligible: Vec<ContactId>,
    /// Exclusions bucketed by reason.
    pub exclusions: ExclusionCounts,
    /// Contacts held for their locale window.
    pub deferrals: Vec<Deferral>,
    /// Non-fatal observations (YELLOW health, tier capacity shortfall).
    pub warnings: Vec<String>,
    /// Machine-readable reason when the verdict is `Failed`.
    pub failure_reason: Option<String>,
}

// ─── Gate ────────────────────────────────────────────────────────────

/// The compliance gate for one job.
#[derive(Debug, Clone)]
pub struct ComplianceGate {
    job_id: JobId,
    category: SendCategory,
}

impl ComplianceGate {
    /// Create a gate for a job sending in the given category.
    pub fn new(job_id: JobId, category: SendCategory) -> Self {
        Self { job_id, category }
    }

    /// Evaluate all four checks over the batch.
    ///
    /// Duplicate-marked contacts never reach delivery, so they are
    /// skipped here without counting toward any bucket.
    pub fn evaluate<C: ConsentStore, S: SuppressionStore>(
        &self,
        contacts: &[ProcessedContact],
        consent: &C,
        suppression: &S,
        health: &AccountHealth,
        now: Timestamp,
    ) -> ComplianceOutcome {
        if health.rating == QualityRating::Red {
            warn!(job_id = %self.job_id, "account health RED, failing job before dispatch");
            return ComplianceOutcome {
                verdict: ComplianceVerdict::Failed,
                eligible: Vec::new(),
                exclusions: ExclusionCounts::default(),
                deferrals: Vec::new(),
                warnings: Vec::new(),
                failure_reason: Some("account_health_red".to_string()),
            };
        }

        let mut eligible = Vec::new();
        let mut exclusions = ExclusionCounts::default();
        let mut deferrals = Vec::new();

        for contact in contacts.iter().filter(|c| !c.is_duplicate()) {
            match consent.state(&contact.phone, self.category) {
                ConsentState::NoRecord => {
                    exclusions.no_consent += 1;
                    continue;
                }
                ConsentState::OptedOut => {
                    exclusions.opted_out += 1;
                    continue;
                }
                ConsentState::OptedIn => {}
            }

            if let Some(scope) = suppression.active_scope(&contact.phone, self.job_id, now) {
                match scope {
                    SuppressionScope::Global => exclusions.suppressed_global += 1,
                    SuppressionScope::Campaign(_) => exclusions.suppressed_campaign += 1,
                    SuppressionScope::Temporary => exclusions.suppressed_temporary += 1,
                    SuppressionScope::Bounce => exclusions.suppressed_bounce += 1,
                }
                continue;
            }

            match WindowCheck::evaluate(contact.country, now) {
                WindowCheck::InWindow => eligible.push(contact.id),
                WindowCheck::Deferred { resume_at } => deferrals.push(Deferral {
                    contact_id: contact.id,
                    resume_at,
                }),
            }
        }

        let mut warnings = Vec::new();
        if health.rating == QualityRating::Yellow {
            warnings.push("account health YELLOW, reduced throughput likely".to_string());
        }
        if let Some(limit) = health.tier.daily_limit() {
            let demand = eligible.len() as u32 + deferrals.len() as u32;
            if demand > limit {
                warnings.push(format!(
                    "tier capacity {limit} below {demand} sendable contacts"
                ));
            }
        }

        let verdict = if !eligible.is_empty() {
            ComplianceVerdict::Passed
        } else if !deferrals.is_empty() {
            ComplianceVerdict::ScheduleRequired
        } else {
            ComplianceVerdict::Failed
        };
        let failure_reason = (verdict == ComplianceVerdict::Failed)
            .then(|| "all_contacts_excluded".to_string());

        info!(
            job_id = %self.job_id,
            verdict = %verdict,
            eligible = eligible.len(),
            excluded = exclusions.total(),
            deferred = deferrals.len(),
            "compliance check complete"
        );
        ComplianceOutcome {
            verdict,
            eligible,
            exclusions,
            deferrals,
            warnings,
            failure_reason,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
