//! # Phase Handlers
//!
//! One handler per working phase, selected by exhaustive match on the
//! phase enum. A handler reads and mutates the job's workspace, then
//! names the transition it wants; the engine validates and commits it.
//! Phases without processing work (terminal phases, the queue-driven
//! SENDING phase, the externally-driven approval wait) have no handler.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use bcast_compliance::{
    AccountHealth, ComplianceGate, ComplianceOutcome, ComplianceVerdict, ConsentStore,
    SuppressionStore,
};
use bcast_contacts::{
    DedupEngine, EngagementLevel, Normalizer, ProcessedContact, QualityScorer, RawContact,
    ScoreInputs,
};
use bcast_core::{ContactId, CountryCode, PhoneE164, SendCategory, Timestamp};
use bcast_segment::{ContactActivity, FrequencyLedger, SegmentBuilder, SegmentationOutput};
use bcast_state::{
    BroadcastJob, BroadcastPhase, ContactCounts, StatusReason, Template, TemplateStatus,
};

use crate::engine::EngineError;

// ─── Workspace & Services ────────────────────────────────────────────

/// Mutable working data carried across one job's phases.
#[derive(Debug)]
pub struct JobWorkspace {
    /// Send category of the campaign.
    pub category: SendCategory,
    /// Default country for national-format numbers.
    pub default_country: CountryCode,
    /// Uploaded rows, consumed by DATA_PROCESSING.
    pub raw_contacts: Vec<RawContact>,
    /// Identities seen in the owner's prior jobs.
    pub seen: HashSet<PhoneE164>,
    /// Interaction recency per contact.
    pub activity: HashMap<ContactId, ContactActivity>,
    /// The campaign template, consumed by CONTENT_CREATION.
    pub template: Option<Template>,

    /// Validated contacts, produced by DATA_PROCESSING.
    pub contacts: Vec<ProcessedContact>,
    /// Gate output, produced by COMPLIANCE_CHECK.
    pub compliance: Option<ComplianceOutcome>,
    /// Segmentation output, produced by SEGMENTATION.
    pub segments: Option<SegmentationOutput>,
}

impl JobWorkspace {
    /// Workspace for a fresh campaign.
    pub fn new(
        category: SendCategory,
        default_country: CountryCode,
        raw_contacts: Vec<RawContact>,
    ) -> Self {
        Self {
            category,
            default_country,
            raw_contacts,
            seen: HashSet::new(),
            activity: HashMap::new(),
            template: None,
            contacts: Vec::new(),
            compliance: None,
            segments: None,
        }
    }
}

/// Shared services a handler runs against.
pub struct PhaseServices<'a, C, S> {
    /// Consent log handle.
    pub consent: &'a C,
    /// Suppression list handle.
    pub suppression: &'a S,
    /// Send-frequency history.
    pub ledger: &'a FrequencyLedger,
    /// Provider account standing.
    pub health: AccountHealth,
    /// The clock.
    pub now: Timestamp,
}

// ─── Outcome & Trait ─────────────────────────────────────────────────

/// The transition a handler requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    /// Requested next phase.
    pub next_phase: BroadcastPhase,
    /// Machine-readable reason.
    pub reason: StatusReason,
    /// Phase-specific summary, persisted with the job where relevant.
    pub detail: Option<serde_json::Value>,
}

/// Processing for one working phase.
pub trait PhaseHandler<C: ConsentStore, S: SuppressionStore> {
    /// Run the phase and request the next transition.
    fn process(
        &self,
        job: &mut BroadcastJob,
        workspace: &mut JobWorkspace,
        services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError>;
}

/// The handler for a phase, or `None` for phases without processing
/// work.
pub fn handler_for<C: ConsentStore, S: SuppressionStore>(
    phase: BroadcastPhase,
) -> Option<Box<dyn PhaseHandler<C, S>>> {
    match phase {
        BroadcastPhase::DataProcessing => Some(Box::new(DataProcessingHandler)),
        BroadcastPhase::ComplianceCheck => Some(Box::new(ComplianceCheckHandler)),
        BroadcastPhase::Segmentation => Some(Box::new(SegmentationHandler)),
        BroadcastPhase::ContentCreation => Some(Box::new(ContentCreationHandler)),
        BroadcastPhase::Initialized
        | BroadcastPhase::PendingApproval
        | BroadcastPhase::ReadyToSend
        | BroadcastPhase::Sending
        | BroadcastPhase::Paused
        | BroadcastPhase::Completed
        | BroadcastPhase::Failed
        | BroadcastPhase::Cancelled => None,
    }
}

// ─── DATA_PROCESSING ─────────────────────────────────────────────────

/// Normalizes, deduplicates, and scores the uploaded batch.
pub struct DataProcessingHandler;

impl DataProcessingHandler {
    fn score_inputs(
        contact: &ProcessedContact,
        activity: Option<&ContactActivity>,
        now: Timestamp,
    ) -> ScoreInputs {
        let mut inputs = QualityScorer::baseline_inputs(contact);
        if let Some(act) = activity {
            inputs.days_since_last_interaction = act.days_since_interaction(now);
            inputs.engagement = match (act.last_inbound_at, act.last_interaction_at) {
                (Some(_), _) => EngagementLevel::Active,
                (None, Some(_)) => EngagementLevel::Passive,
                (None, None) => EngagementLevel::None,
            };
        }
        inputs
    }
}

impl<C: ConsentStore, S: SuppressionStore> PhaseHandler<C, S> for DataProcessingHandler {
    fn process(
        &self,
        job: &mut BroadcastJob,
        workspace: &mut JobWorkspace,
        services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError> {
        let rows = std::mem::take(&mut workspace.raw_contacts);
        let batch = Normalizer::new(workspace.default_country).normalize_batch(rows);
        let mut contacts = batch.contacts;

        let dedup = DedupEngine::new().run(&mut contacts, &workspace.seen);

        let scorer = QualityScorer::new();
        let inputs: Vec<ScoreInputs> = contacts
            .iter()
            .map(|c| Self::score_inputs(c, workspace.activity.get(&c.id), services.now))
            .collect();
        scorer.score_batch(&mut contacts, &inputs);

        let usable = contacts.iter().filter(|c| !c.is_duplicate()).count() as u32;
        job.record_contact_counts(ContactCounts {
            total: batch.summary.total,
            valid: batch.summary.valid,
            invalid: batch.summary.invalid,
        });
        workspace.contacts = contacts;

        info!(
            job_id = %job.id,
            total = batch.summary.total,
            usable,
            duplicates = dedup.total(),
            "data processing complete"
        );
        let detail = Some(serde_json::json!({
            "batch": batch.summary,
            "duplicates": dedup,
        }));
        if usable == 0 {
            job.error_message = Some("no valid contacts after processing".to_string());
            return Ok(PhaseOutcome {
                next_phase: BroadcastPhase::Failed,
                reason: StatusReason::NoValidContacts,
                detail,
            });
        }
        Ok(PhaseOutcome {
            next_phase: BroadcastPhase::ComplianceCheck,
            reason: StatusReason::PhaseComplete,
            detail,
        })
    }
}

// ─── COMPLIANCE_CHECK ────────────────────────────────────────────────

/// Runs the 4-check compliance gate.
pub struct ComplianceCheckHandler;

impl<C: ConsentStore, S: SuppressionStore> PhaseHandler<C, S> for ComplianceCheckHandler {
    fn process(
        &self,
        job: &mut BroadcastJob,
        workspace: &mut JobWorkspace,
        services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError> {
        let gate = ComplianceGate::new(job.id, workspace.category);
        let outcome = gate.evaluate(
            &workspace.contacts,
            services.consent,
            services.suppression,
            &services.health,
            services.now,
        );

        job.compliance_status = Some(outcome.verdict.as_str().to_ascii_lowercase());
        let detail = Some(serde_json::to_value(&outcome)?);
        let phase_outcome = match outcome.verdict {
            ComplianceVerdict::Passed => PhaseOutcome {
                next_phase: BroadcastPhase::Segmentation,
                reason: StatusReason::PhaseComplete,
                detail,
            },
            ComplianceVerdict::ScheduleRequired => PhaseOutcome {
                next_phase: BroadcastPhase::Segmentation,
                reason: StatusReason::ScheduleRequired,
                detail,
            },
            ComplianceVerdict::Failed => {
                let reason = if outcome.failure_reason.as_deref() == Some("account_health_red") {
                    StatusReason::AccountHealthRed
                } else {
                    StatusReason::ComplianceFailed
                };
                job.error_message = outcome.failure_reason.clone();
                PhaseOutcome {
                    next_phase: BroadcastPhase::Failed,
                    reason,
                    detail,
                }
            }
        };
        workspace.compliance = Some(outcome);
        Ok(phase_outcome)
    }
}

// ─── SEGMENTATION ────────────────────────────────────────────────────

/// Segments the compliance-passed contacts.
pub struct SegmentationHandler;

impl<C: ConsentStore, S: SuppressionStore> PhaseHandler<C, S> for SegmentationHandler {
    fn process(
        &self,
        job: &mut BroadcastJob,
        workspace: &mut JobWorkspace,
        services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError> {
        // Contacts the gate let through now or deferred to a window.
        let sendable: HashSet<ContactId> = workspace
            .compliance
            .as_ref()
            .map(|c| {
                c.eligible
                    .iter()
                    .copied()
                    .chain(c.deferrals.iter().map(|d| d.contact_id))
                    .collect()
            })
            .unwrap_or_default();
        let contacts: Vec<ProcessedContact> = workspace
            .contacts
            .iter()
            .filter(|c| sendable.contains(&c.id))
            .cloned()
            .collect();

        let output = SegmentBuilder::new(workspace.category).build(
            &contacts,
            &workspace.activity,
            services.ledger,
            services.now,
        );
        job.segment_summary = Some(serde_json::to_value(&output.summary)?);
        let detail = Some(serde_json::to_value(&output.summary)?);
        workspace.segments = Some(output);

        Ok(PhaseOutcome {
            next_phase: BroadcastPhase::ContentCreation,
            reason: StatusReason::PhaseComplete,
            detail,
        })
    }
}

// ─── CONTENT_CREATION ────────────────────────────────────────────────

/// Attaches the campaign template and routes by its approval status.
pub struct ContentCreationHandler;

impl<C: ConsentStore, S: SuppressionStore> PhaseHandler<C, S> for ContentCreationHandler {
    fn process(
        &self,
        job: &mut BroadcastJob,
        workspace: &mut JobWorkspace,
        _services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError> {
        let template = workspace
            .template
            .as_mut()
            .ok_or(EngineError::MissingTemplate { job_id: job.id })?;
        job.template_id = Some(template.id);

        match template.status {
            TemplateStatus::Approved => Ok(PhaseOutcome {
                next_phase: BroadcastPhase::ReadyToSend,
                reason: StatusReason::TemplateApproved,
                detail: None,
            }),
            TemplateStatus::Draft => {
                template.submit()?;
                Ok(PhaseOutcome {
                    next_phase: BroadcastPhase::PendingApproval,
                    reason: StatusReason::TemplateSubmitted,
                    detail: None,
                })
            }
            TemplateStatus::Rejected => {
                // Revised copy goes back through review.
                template.revise()?;
                template.submit()?;
                Ok(PhaseOutcome {
                    next_phase: BroadcastPhase::PendingApproval,
                    reason: StatusReason::TemplateSubmitted,
                    detail: None,
                })
            }
            TemplateStatus::Pending => Ok(PhaseOutcome {
                next_phase: BroadcastPhase::PendingApproval,
                reason: StatusReason::TemplateSubmitted,
                detail: None,
            }),
            TemplateStatus::Deleted => Err(EngineError::TemplateNotUsable {
                job_id: job.id,
                status: template.status,
            }),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
