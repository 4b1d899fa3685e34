//! # The Orchestration Engine
//!
//! Owns a job repository and exposes the caller-facing operations:
//! create, start, run the current phase, advance, begin sending, pause,
//! resume, cancel, complete. Every operation returns the job's new
//! phase or the specific invariant it violated; nothing mutates state
//! on an error path.

use thiserror::Error;
use tracing::info;

use bcast_compliance::{ConsentStore, SuppressionStore};
use bcast_core::JobId;
use bcast_dispatch::{Dispatcher, DispatcherSnapshot};
use bcast_state::{
    BroadcastJob, BroadcastPhase, JobError, StatusReason, Template, TemplateError, TemplateStatus,
};

use crate::handler::{handler_for, JobWorkspace, PhaseOutcome, PhaseServices};
use crate::repo::{JobRepository, RepoError};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors surfaced by engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A phase transition the table does not allow.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A storage-boundary failure.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// A template lifecycle violation.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// CONTENT_CREATION ran without a template in the workspace.
    #[error("job {job_id} has no template")]
    MissingTemplate {
        /// The job.
        job_id: JobId,
    },

    /// The attached template cannot be used.
    #[error("job {job_id} template is {status}")]
    TemplateNotUsable {
        /// The job.
        job_id: JobId,
        /// The template's status.
        status: TemplateStatus,
    },

    /// SENDING was requested without an approved template.
    #[error("job {job_id} cannot send: template is {status}, not APPROVED")]
    TemplateNotApproved {
        /// The job.
        job_id: JobId,
        /// The template's status.
        status: TemplateStatus,
    },

    /// The job's current phase has no processing handler.
    #[error("phase {phase} has no handler")]
    NoHandler {
        /// The phase.
        phase: BroadcastPhase,
    },

    /// A phase summary failed to serialize.
    #[error("failed to serialize phase summary")]
    Summary(#[from] serde_json::Error),
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The orchestration engine over a job repository.
#[derive(Debug)]
pub struct Engine<R> {
    repo: R,
}

impl<R: JobRepository> Engine<R> {
    /// Create an engine over the repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Read access to the repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Create a job in INITIALIZED and persist it.
    pub fn create_job(
        &mut self,
        user_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<BroadcastJob, EngineError> {
        let job = BroadcastJob::new(JobId::new(), user_id, project_id);
        info!(job_id = %job.id, "job created");
        self.repo.create(job.clone())?;
        Ok(job)
    }

    /// Load a job.
    pub fn get(&self, job_id: JobId) -> Result<BroadcastJob, EngineError> {
        Ok(self.repo.get(job_id)?)
    }

    /// INITIALIZED → DATA_PROCESSING.
    pub fn start(&mut self, job_id: JobId) -> Result<BroadcastPhase, EngineError> {
        let job = self.repo.update_phase(
            job_id,
            BroadcastPhase::DataProcessing,
            StatusReason::PhaseComplete,
        )?;
        info!(job_id = %job_id, phase = %job.phase, "job started");
        Ok(job.phase)
    }

    /// Run the handler for the job's current phase, then commit the
    /// transition it requests.
    pub fn run_phase<C: ConsentStore, S: SuppressionStore>(
        &mut self,
        job_id: JobId,
        workspace: &mut JobWorkspace,
        services: &PhaseServices<'_, C, S>,
    ) -> Result<PhaseOutcome, EngineError> {
        let mut job = self.repo.get(job_id)?;
        let handler = handler_for::<C, S>(job.phase)
            .ok_or(EngineError::NoHandler { phase: job.phase })?;
        let outcome = handler.process(&mut job, workspace, services)?;
        job.transition(outcome.next_phase, outcome.reason)?;
        self.repo.save(job)?;
        Ok(outcome)
    }

    /// Commit an already-computed phase outcome.
    pub fn advance(
        &mut self,
        job_id: JobId,
        outcome: &PhaseOutcome,
    ) -> Result<BroadcastPhase, EngineError> {
        let job = self
            .repo
            .update_phase(job_id, outcome.next_phase, outcome.reason)?;
        Ok(job.phase)
    }

    /// Record the provider's approval decision for a job parked in
    /// PENDING_APPROVAL. Approval moves to READY_TO_SEND; rejection
    /// sends the job back to CONTENT_CREATION for rework.
    pub fn record_approval(
        &mut self,
        job_id: JobId,
        template: &mut Template,
        approved: bool,
        rejection_reason: Option<String>,
    ) -> Result<BroadcastPhase, EngineError> {
        if approved {
            template.approve()?;
            let job = self.repo.update_phase(
                job_id,
                BroadcastPhase::ReadyToSend,
                StatusReason::TemplateApproved,
            )?;
            Ok(job.phase)
        } else {
            template.reject(rejection_reason.unwrap_or_default())?;
            let job = self.repo.update_phase(
                job_id,
                BroadcastPhase::ContentCreation,
                StatusReason::TemplateRejected,
            )?;
            Ok(job.phase)
        }
    }

    /// READY_TO_SEND → SENDING. Requires an approved template.
    pub fn begin_sending(
        &mut self,
        job_id: JobId,
        template: &Template,
    ) -> Result<BroadcastPhase, EngineError> {
        if !template.is_approved() {
            return Err(EngineError::TemplateNotApproved {
                job_id,
                status: template.status,
            });
        }
        let job = self.repo.update_phase(
            job_id,
            BroadcastPhase::Sending,
            StatusReason::PhaseComplete,
        )?;
        Ok(job.phase)
    }

    /// SENDING → PAUSED, freezing the dispatcher.
    pub fn pause(
        &mut self,
        job_id: JobId,
        dispatcher: &mut Dispatcher,
    ) -> Result<DispatcherSnapshot, EngineError> {
        self.repo
            .update_phase(job_id, BroadcastPhase::Paused, StatusReason::UserPause)?;
        dispatcher.pause("user_pause");
        info!(job_id = %job_id, "job paused, dispatcher frozen");
        Ok(dispatcher.snapshot())
    }

    /// PAUSED → SENDING, restoring the dispatcher verbatim.
    pub fn resume(
        &mut self,
        job_id: JobId,
        snapshot: DispatcherSnapshot,
    ) -> Result<Dispatcher, EngineError> {
        self.repo
            .update_phase(job_id, BroadcastPhase::Sending, StatusReason::UserResume)?;
        let mut dispatcher = Dispatcher::from_snapshot(snapshot);
        dispatcher.resume();
        info!(job_id = %job_id, "job resumed");
        Ok(dispatcher)
    }

    /// Cancel from READY_TO_SEND or PAUSED. New dispatch stops
    /// immediately; attempts already handed to the gateway finish.
    pub fn cancel(
        &mut self,
        job_id: JobId,
        dispatcher: Option<&mut Dispatcher>,
    ) -> Result<BroadcastPhase, EngineError> {
        let job = self.repo.update_phase(
            job_id,
            BroadcastPhase::Cancelled,
            StatusReason::UserCancel,
        )?;
        if let Some(d) = dispatcher {
            d.cancel();
        }
        info!(job_id = %job_id, "job cancelled");
        Ok(job.phase)
    }

    /// SENDING → COMPLETED once the dispatcher drains.
    pub fn complete(&mut self, job_id: JobId) -> Result<BroadcastPhase, EngineError> {
        let job = self.repo.update_phase(
            job_id,
            BroadcastPhase::Completed,
            StatusReason::DeliveryComplete,
        )?;
        Ok(job.phase)
    }

    /// SENDING → PAUSED with a dispatcher-reported reason, e.g. an
    /// exhausted tier budget.
    pub fn pause_for(
        &mut self,
        job_id: JobId,
        reason: StatusReason,
    ) -> Result<BroadcastPhase, EngineError> {
        let job = self
            .repo
            .update_phase(job_id, BroadcastPhase::Paused, reason)?;
        Ok(job.phase)
    }

    /// SENDING → FAILED on a structural delivery failure.
    pub fn fail_delivery(
        &mut self,
        job_id: JobId,
        detail: impl Into<String>,
    ) -> Result<BroadcastPhase, EngineError> {
        let mut job = self.repo.get(job_id)?;
        job.transition(BroadcastPhase::Failed, StatusReason::ProviderFailure)?;
        job.error_message = Some(detail.into());
        self.repo.save(job)?;
        Ok(BroadcastPhase::Failed)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::InMemoryJobRepository;
    use bcast_compliance::{
        apply_keyword, AccountHealth, InMemoryConsentStore, InMemorySuppressionStore,
        InboundKeyword,
    };
    use bcast_contacts::RawContact;
    use bcast_core::{
        ContactId, CountryCode, MessagingTier, PhoneE164, QualityRating, SendCategory, Timestamp,
    };
    use bcast_dispatch::{
        DeliveryReceipt, DispatchState, HealthReport, MessagingGateway, OutboundMessage, Priority,
        QueuedSend, SendError, TIER_LIMIT_EXHAUSTED,
    };
    use bcast_segment::FrequencyLedger;
    use bcast_state::{TemplateCategory, TemplateComponent};

    struct AcceptingGateway {
        sent: u32,
    }

    impl MessagingGateway for AcceptingGateway {
        fn submit_template(&mut self, _template: &Template) -> Result<String, SendError> {
            Ok("tpl-ref".to_string())
        }

        fn template_status(&mut self, _provider_ref: &str) -> Result<TemplateStatus, SendError> {
            Ok(TemplateStatus::Approved)
        }

        fn send_reduced_cost(
            &mut self,
            _message: &OutboundMessage,
        ) -> Result<DeliveryReceipt, SendError> {
            self.sent += 1;
            Ok(DeliveryReceipt {
                provider_message_id: format!("wamid.{}", self.sent),
            })
        }

        fn send_full(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, SendError> {
            self.send_reduced_cost(message)
        }

        fn mark_read(&mut self, _provider_message_id: &str) -> Result<(), SendError> {
            Ok(())
        }

        fn account_health(&mut self) -> Result<HealthReport, SendError> {
            Ok(HealthReport {
                rating: QualityRating::Green,
                tier: MessagingTier::Tier2,
            })
        }
    }

    fn at(iso: &str) -> Timestamp {
        Timestamp::parse(iso).unwrap()
    }

    // Midday IST.
    fn now() -> Timestamp {
        at("2026-03-02T06:30:00Z")
    }

    fn raw(phone: &str) -> RawContact {
        RawContact {
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    fn approved_template() -> Template {
        let mut t = Template::new_draft(
            "spring_offer",
            "en",
            TemplateCategory::Marketing,
            vec![TemplateComponent::Body {
                text: "Hi {{1}}".to_string(),
            }],
        );
        t.submit().unwrap();
        t.approve().unwrap();
        t
    }

    fn opt_in_all(consent: &mut InMemoryConsentStore, workspace: &JobWorkspace) {
        use bcast_compliance::{ConsentAction, ConsentEvent, ConsentScope};
        for contact in &workspace.contacts {
            consent.record(ConsentEvent {
                phone: contact.phone.clone(),
                action: ConsentAction::OptIn,
                scope: ConsentScope::All,
                source: "signup_form".to_string(),
                at: at("2026-01-01T00:00:00Z"),
            });
        }
    }

    fn green_health() -> AccountHealth {
        AccountHealth {
            rating: QualityRating::Green,
            tier: MessagingTier::Tier2,
        }
    }

    #[test]
    fn test_full_pipeline_to_completed() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let mut consent = InMemoryConsentStore::new();
        let suppression = InMemorySuppressionStore::new();
        let ledger = FrequencyLedger::new();

        let job = engine.create_job("user-1", "project-1").unwrap();
        assert_eq!(
            engine.start(job.id).unwrap(),
            BroadcastPhase::DataProcessing
        );

        let mut ws = JobWorkspace::new(
            SendCategory::Marketing,
            CountryCode::In,
            vec![raw("+919876543210"), raw("+919811112222"), raw("bad!")],
        );
        ws.template = Some(approved_template());

        // DATA_PROCESSING.
        {
            let svc = PhaseServices {
                consent: &consent,
                suppression: &suppression,
                ledger: &ledger,
                health: green_health(),
                now: now(),
            };
            let outcome = engine.run_phase(job.id, &mut ws, &svc).unwrap();
            assert_eq!(outcome.next_phase, BroadcastPhase::ComplianceCheck);
        }
        opt_in_all(&mut consent, &ws);

        // COMPLIANCE_CHECK, SEGMENTATION, CONTENT_CREATION.
        {
            let svc = PhaseServices {
                consent: &consent,
                suppression: &suppression,
                ledger: &ledger,
                health: green_health(),
                now: now(),
            };
            assert_eq!(
                engine.run_phase(job.id, &mut ws, &svc).unwrap().next_phase,
                BroadcastPhase::Segmentation
            );
            assert_eq!(
                engine.run_phase(job.id, &mut ws, &svc).unwrap().next_phase,
                BroadcastPhase::ContentCreation
            );
            assert_eq!(
                engine.run_phase(job.id, &mut ws, &svc).unwrap().next_phase,
                BroadcastPhase::ReadyToSend
            );
        }

        // SENDING: dispatch the eligible contacts.
        let template = ws.template.clone().unwrap();
        assert_eq!(
            engine.begin_sending(job.id, &template).unwrap(),
            BroadcastPhase::Sending
        );
        let mut dispatcher = Dispatcher::new(job.id, MessagingTier::Tier2, 100);
        for contact in ws.contacts.iter().filter(|c| !c.is_duplicate()) {
            dispatcher.enqueue(QueuedSend::new(
                contact.id,
                contact.phone.clone(),
                template.id,
                Priority::Normal,
            ));
        }
        let mut gateway = AcceptingGateway { sent: 0 };
        let report = dispatcher.tick(now(), &mut gateway);
        assert_eq!(report.sent, 2);
        assert!(report.completed);

        assert_eq!(engine.complete(job.id).unwrap(), BroadcastPhase::Completed);
        let stored = engine.get(job.id).unwrap();
        assert!(stored.is_terminal());
        assert_eq!(stored.contacts.valid, 2);
        assert_eq!(stored.compliance_status.as_deref(), Some("passed"));
        assert!(stored.segment_summary.is_some());
        assert!(stored.started_sending_at.is_some());
    }

    #[test]
    fn test_keyword_read_your_writes_across_jobs() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let mut consent = InMemoryConsentStore::new();
        let mut suppression = InMemorySuppressionStore::new();
        let ledger = FrequencyLedger::new();
        let target = PhoneE164::parse("+919876543210").unwrap();

        // Job A processes and passes compliance for the contact.
        let job_a = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job_a.id).unwrap();
        let mut ws_a = JobWorkspace::new(
            SendCategory::Marketing,
            CountryCode::In,
            vec![raw("+919876543210")],
        );
        {
            let svc = PhaseServices {
                consent: &consent,
                suppression: &suppression,
                ledger: &ledger,
                health: green_health(),
                now: now(),
            };
            engine.run_phase(job_a.id, &mut ws_a, &svc).unwrap();
        }
        opt_in_all(&mut consent, &ws_a);
        {
            let svc = PhaseServices {
                consent: &consent,
                suppression: &suppression,
                ledger: &ledger,
                health: green_health(),
                now: now(),
            };
            let outcome = engine.run_phase(job_a.id, &mut ws_a, &svc).unwrap();
            assert_eq!(outcome.next_phase, BroadcastPhase::Segmentation);
        }

        // The contact texts STOP between the two campaigns.
        apply_keyword(
            &mut consent,
            &mut suppression,
            &target,
            InboundKeyword::Stop,
            now(),
        );

        // Job B sees the opt-out on its very next check.
        let job_b = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job_b.id).unwrap();
        let mut ws_b = JobWorkspace::new(
            SendCategory::Marketing,
            CountryCode::In,
            vec![raw("+919876543210")],
        );
        {
            let svc = PhaseServices {
                consent: &consent,
                suppression: &suppression,
                ledger: &ledger,
                health: green_health(),
                now: now(),
            };
            engine.run_phase(job_b.id, &mut ws_b, &svc).unwrap();
            let outcome = engine.run_phase(job_b.id, &mut ws_b, &svc).unwrap();
            assert_eq!(outcome.next_phase, BroadcastPhase::Failed);
        }
        let stored = engine.get(job_b.id).unwrap();
        assert_eq!(stored.phase, BroadcastPhase::Failed);
        assert_eq!(stored.compliance_status.as_deref(), Some("failed"));
    }

    #[test]
    fn test_template_approval_gates_sending() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        // Walk the job to READY_TO_SEND through the repository to keep
        // the table honest.
        engine.start(job.id).unwrap();
        for (phase, reason) in [
            (BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete),
            (BroadcastPhase::Segmentation, StatusReason::PhaseComplete),
            (BroadcastPhase::ContentCreation, StatusReason::PhaseComplete),
            (BroadcastPhase::ReadyToSend, StatusReason::TemplateApproved),
        ] {
            engine.repo.update_phase(job.id, phase, reason).unwrap();
        }

        let mut pending = Template::new_draft(
            "spring_offer",
            "en",
            TemplateCategory::Marketing,
            vec![TemplateComponent::Body {
                text: "Hi".to_string(),
            }],
        );
        pending.submit().unwrap();

        let err = engine.begin_sending(job.id, &pending).unwrap_err();
        assert!(matches!(err, EngineError::TemplateNotApproved { .. }));
        // The job did not move.
        assert_eq!(
            engine.get(job.id).unwrap().phase,
            BroadcastPhase::ReadyToSend
        );
    }

    #[test]
    fn test_pause_resume_roundtrip_preserves_dispatcher() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job.id).unwrap();
        for (phase, reason) in [
            (BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete),
            (BroadcastPhase::Segmentation, StatusReason::PhaseComplete),
            (BroadcastPhase::ContentCreation, StatusReason::PhaseComplete),
            (BroadcastPhase::ReadyToSend, StatusReason::TemplateApproved),
            (BroadcastPhase::Sending, StatusReason::PhaseComplete),
        ] {
            engine.repo.update_phase(job.id, phase, reason).unwrap();
        }

        let mut dispatcher = Dispatcher::new(job.id, MessagingTier::Tier2, 100);
        for n in 0..3 {
            dispatcher.enqueue(QueuedSend::new(
                ContactId::new(),
                PhoneE164::parse(&format!("+9198{n:08}")).unwrap(),
                approved_template().id,
                Priority::Normal,
            ));
        }

        let snapshot = engine.pause(job.id, &mut dispatcher).unwrap();
        assert_eq!(engine.get(job.id).unwrap().phase, BroadcastPhase::Paused);

        let mut restored = engine.resume(job.id, snapshot).unwrap();
        assert_eq!(engine.get(job.id).unwrap().phase, BroadcastPhase::Sending);
        assert_eq!(*restored.state(), DispatchState::Running);
        assert_eq!(restored.queued(), 3);

        let mut gateway = AcceptingGateway { sent: 0 };
        let report = restored.tick(now(), &mut gateway);
        assert_eq!(report.sent, 3);
    }

    #[test]
    fn test_tier_exhaustion_pauses_job_not_fails() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job.id).unwrap();
        for (phase, reason) in [
            (BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete),
            (BroadcastPhase::Segmentation, StatusReason::PhaseComplete),
            (BroadcastPhase::ContentCreation, StatusReason::PhaseComplete),
            (BroadcastPhase::ReadyToSend, StatusReason::TemplateApproved),
            (BroadcastPhase::Sending, StatusReason::PhaseComplete),
        ] {
            engine.repo.update_phase(job.id, phase, reason).unwrap();
        }

        let mut dispatcher = Dispatcher::new(job.id, MessagingTier::Unverified, 10_000);
        let template_id = approved_template().id;
        for n in 0..300 {
            dispatcher.enqueue(QueuedSend::new(
                ContactId::new(),
                PhoneE164::parse(&format!("+9198{n:08}")).unwrap(),
                template_id,
                Priority::Normal,
            ));
        }
        let mut gateway = AcceptingGateway { sent: 0 };
        let report = dispatcher.tick(now(), &mut gateway);
        assert_eq!(report.sent, 250);
        assert_eq!(report.paused_reason.as_deref(), Some(TIER_LIMIT_EXHAUSTED));

        let phase = engine
            .pause_for(job.id, StatusReason::TierLimitExhausted)
            .unwrap();
        assert_eq!(phase, BroadcastPhase::Paused);
        let stored = engine.get(job.id).unwrap();
        assert_eq!(
            stored.status_reason,
            Some(StatusReason::TierLimitExhausted)
        );
    }

    #[test]
    fn test_cancel_from_paused() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job.id).unwrap();
        for (phase, reason) in [
            (BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete),
            (BroadcastPhase::Segmentation, StatusReason::PhaseComplete),
            (BroadcastPhase::ContentCreation, StatusReason::PhaseComplete),
            (BroadcastPhase::ReadyToSend, StatusReason::TemplateApproved),
            (BroadcastPhase::Sending, StatusReason::PhaseComplete),
            (BroadcastPhase::Paused, StatusReason::UserPause),
        ] {
            engine.repo.update_phase(job.id, phase, reason).unwrap();
        }

        let mut dispatcher = Dispatcher::new(job.id, MessagingTier::Tier2, 100);
        dispatcher.pause("user_pause");
        let phase = engine.cancel(job.id, Some(&mut dispatcher)).unwrap();
        assert_eq!(phase, BroadcastPhase::Cancelled);
        assert_eq!(*dispatcher.state(), DispatchState::Cancelled);
    }

    #[test]
    fn test_rejection_reworks_content() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job.id).unwrap();
        for (phase, reason) in [
            (BroadcastPhase::ComplianceCheck, StatusReason::PhaseComplete),
            (BroadcastPhase::Segmentation, StatusReason::PhaseComplete),
            (BroadcastPhase::ContentCreation, StatusReason::PhaseComplete),
            (
                BroadcastPhase::PendingApproval,
                StatusReason::TemplateSubmitted,
            ),
        ] {
            engine.repo.update_phase(job.id, phase, reason).unwrap();
        }

        let mut template = Template::new_draft(
            "spring_offer",
            "en",
            TemplateCategory::Marketing,
            vec![TemplateComponent::Body {
                text: "Hi".to_string(),
            }],
        );
        template.submit().unwrap();

        let phase = engine
            .record_approval(job.id, &mut template, false, Some("policy".to_string()))
            .unwrap();
        assert_eq!(phase, BroadcastPhase::ContentCreation);
        assert_eq!(template.status, TemplateStatus::Rejected);
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut engine = Engine::new(InMemoryJobRepository::new());
        let job = engine.create_job("user-1", "project-1").unwrap();
        engine.start(job.id).unwrap();
        assert!(matches!(
            engine.start(job.id),
            Err(EngineError::Repo(RepoError::InvalidPhaseWrite { .. }))
        ));
    }
}
