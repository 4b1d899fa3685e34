//! # Run Subcommand
//!
//! Drives one simulated campaign end to end: contact file in, phase
//! pipeline through the engine, dispatch through a scripted gateway,
//! final job record out as JSON. Stores are in-memory and the run
//! assumes an opted-in list, so this exercises the whole pipeline
//! without touching a provider.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use tracing::{info, warn};

use bcast_compliance::{
    AccountHealth, ConsentAction, ConsentEvent, ConsentScope, ConsentStore, InMemoryConsentStore,
    InMemorySuppressionStore,
};
use bcast_contacts::RawContact;
use bcast_core::{CountryCode, MessagingTier, QualityRating, SendCategory, Timestamp};
use bcast_dispatch::{
    DeliveryReceipt, Dispatcher, HealthReport, MessagingGateway, OutboundMessage, Priority,
    QueuedSend, SendError,
};
use bcast_engine::{Engine, InMemoryJobRepository, JobWorkspace, PhaseServices};
use bcast_segment::FrequencyLedger;
use bcast_state::{
    BroadcastPhase, StatusReason, Template, TemplateCategory, TemplateComponent,
};

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Contact file: one `phone[,name[,email]]` row per line.
    /// Blank lines and `#` comments are skipped.
    pub contacts: PathBuf,

    /// Default country for national-format numbers (ISO alpha-2).
    #[arg(long, default_value = "IN")]
    pub country: String,

    /// Send category: marketing, promotional, or transactional.
    #[arg(long, default_value = "marketing")]
    pub category: String,

    /// Account messaging tier: unverified, tier1..tier4.
    #[arg(long, default_value = "tier2")]
    pub tier: String,

    /// Account quality rating: green, yellow, or red.
    #[arg(long, default_value = "green")]
    pub rating: String,

    /// Template name submitted for the campaign.
    #[arg(long, default_value = "cli_campaign")]
    pub template: String,

    /// Reject every Nth gateway attempt with a transient code, to
    /// exercise the retry schedule.
    #[arg(long)]
    pub fail_every: Option<u32>,
}

/// Gateway that accepts everything, except a scripted transient
/// rejection every Nth attempt.
struct SimulatedGateway {
    attempts: u32,
    fail_every: Option<u32>,
    rating: QualityRating,
    tier: MessagingTier,
}

impl SimulatedGateway {
    fn attempt(&mut self) -> Result<DeliveryReceipt, SendError> {
        self.attempts += 1;
        if let Some(n) = self.fail_every {
            if n > 0 && self.attempts % n == 0 {
                return Err(SendError::Rejected { code: 130_429 });
            }
        }
        Ok(DeliveryReceipt {
            provider_message_id: format!("wamid.sim.{}", self.attempts),
        })
    }
}

impl MessagingGateway for SimulatedGateway {
    fn submit_template(&mut self, template: &Template) -> Result<String, SendError> {
        Ok(format!("tpl.sim.{}", template.name))
    }

    fn template_status(
        &mut self,
        _provider_ref: &str,
    ) -> Result<bcast_state::TemplateStatus, SendError> {
        Ok(bcast_state::TemplateStatus::Approved)
    }

    fn send_reduced_cost(
        &mut self,
        _message: &OutboundMessage,
    ) -> Result<DeliveryReceipt, SendError> {
        self.attempt()
    }

    fn send_full(&mut self, _message: &OutboundMessage) -> Result<DeliveryReceipt, SendError> {
        self.attempt()
    }

    fn mark_read(&mut self, _provider_message_id: &str) -> Result<(), SendError> {
        Ok(())
    }

    fn account_health(&mut self) -> Result<HealthReport, SendError> {
        Ok(HealthReport {
            rating: self.rating,
            tier: self.tier,
        })
    }
}

fn parse_category(s: &str) -> anyhow::Result<SendCategory> {
    match s.to_ascii_lowercase().as_str() {
        "marketing" => Ok(SendCategory::Marketing),
        "promotional" => Ok(SendCategory::Promotional),
        "transactional" => Ok(SendCategory::Transactional),
        other => bail!("unknown send category: {other:?}"),
    }
}

fn parse_rating(s: &str) -> anyhow::Result<QualityRating> {
    match s.to_ascii_lowercase().as_str() {
        "green" => Ok(QualityRating::Green),
        "yellow" => Ok(QualityRating::Yellow),
        "red" => Ok(QualityRating::Red),
        other => bail!("unknown quality rating: {other:?}"),
    }
}

fn parse_contacts(text: &str) -> Vec<RawContact> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(row, line)| {
            let mut fields = line.split(',').map(str::trim);
            RawContact {
                phone: fields.next().unwrap_or_default().to_string(),
                name: fields.next().filter(|s| !s.is_empty()).map(String::from),
                email: fields.next().filter(|s| !s.is_empty()).map(String::from),
                source_row: Some(row as u32 + 1),
                ..Default::default()
            }
        })
        .collect()
}

/// Run a simulated campaign end to end.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let country: CountryCode = args.country.to_ascii_uppercase().parse()?;
    let category = parse_category(&args.category)?;
    let tier: MessagingTier = args.tier.to_ascii_lowercase().parse()?;
    let rating = parse_rating(&args.rating)?;

    let text = fs::read_to_string(&args.contacts)
        .with_context(|| format!("reading contact file {}", args.contacts.display()))?;
    let rows = parse_contacts(&text);
    if rows.is_empty() {
        bail!("contact file {} has no rows", args.contacts.display());
    }
    info!(rows = rows.len(), country = %country, "contact file parsed");

    let mut consent = InMemoryConsentStore::new();
    let suppression = InMemorySuppressionStore::new();
    let ledger = FrequencyLedger::new();
    let health = AccountHealth { rating, tier };
    let now = Timestamp::now();

    let mut engine = Engine::new(InMemoryJobRepository::new());
    let job = engine.create_job("cli", "cli")?;
    engine.start(job.id)?;

    let mut ws = JobWorkspace::new(category, country, rows);
    let mut template = Template::new_draft(
        args.template.clone(),
        "en",
        TemplateCategory::Marketing,
        vec![TemplateComponent::Body {
            text: "Hello {{1}}".to_string(),
        }],
    );
    template.submit()?;
    template.approve()?;
    ws.template = Some(template.clone());

    // DATA_PROCESSING first, so opt-ins key on canonical identities.
    {
        let svc = PhaseServices {
            consent: &consent,
            suppression: &suppression,
            ledger: &ledger,
            health,
            now,
        };
        let outcome = engine.run_phase(job.id, &mut ws, &svc)?;
        info!(phase = %outcome.next_phase, reason = %outcome.reason, "phase committed");
        if outcome.next_phase == BroadcastPhase::Failed {
            println!("{}", serde_json::to_string_pretty(&engine.get(job.id)?)?);
            return Ok(());
        }
    }
    for contact in &ws.contacts {
        consent.record(ConsentEvent {
            phone: contact.phone.clone(),
            action: ConsentAction::OptIn,
            scope: ConsentScope::All,
            source: "cli_simulation".to_string(),
            at: now,
        });
    }

    // Remaining working phases up to READY_TO_SEND.
    loop {
        let phase = engine.get(job.id)?.phase;
        if phase == BroadcastPhase::ReadyToSend || phase.is_terminal() {
            break;
        }
        let svc = PhaseServices {
            consent: &consent,
            suppression: &suppression,
            ledger: &ledger,
            health,
            now,
        };
        let outcome = engine.run_phase(job.id, &mut ws, &svc)?;
        info!(phase = %outcome.next_phase, reason = %outcome.reason, "phase committed");
    }
    let job_record = engine.get(job.id)?;
    if job_record.phase != BroadcastPhase::ReadyToSend {
        println!("{}", serde_json::to_string_pretty(&job_record)?);
        return Ok(());
    }

    // SENDING.
    engine.begin_sending(job.id, &template)?;
    let mut dispatcher = Dispatcher::new(job.id, tier, 100);
    let eligible: std::collections::HashSet<_> = ws
        .compliance
        .as_ref()
        .map(|c| c.eligible.iter().copied().collect())
        .unwrap_or_default();
    let free_window: std::collections::HashSet<_> = ws
        .segments
        .as_ref()
        .map(|s| s.free_window.iter().copied().collect())
        .unwrap_or_default();
    for contact in ws.contacts.iter().filter(|c| eligible.contains(&c.id)) {
        let priority = if free_window.contains(&contact.id) {
            Priority::FreeWindow
        } else {
            Priority::Normal
        };
        dispatcher.enqueue(QueuedSend::new(
            contact.id,
            contact.phone.clone(),
            template.id,
            priority,
        ));
    }

    let mut gateway = SimulatedGateway {
        attempts: 0,
        fail_every: args.fail_every,
        rating,
        tier,
    };
    let mut tick_at = now;
    loop {
        let report = dispatcher.tick(tick_at, &mut gateway);
        info!(
            sent = report.sent,
            retries = report.retries_scheduled,
            failed = report.permanent_failures,
            "dispatch tick"
        );
        if let Some(reason) = report.paused_reason {
            warn!(reason = %reason, "dispatch paused");
            engine.pause_for(job.id, StatusReason::TierLimitExhausted)?;
            break;
        }
        if report.completed {
            engine.complete(job.id)?;
            break;
        }
        // Jump the clock to the next retry instead of idling.
        tick_at = dispatcher.next_due_at().unwrap_or(tick_at.plus_secs(30));
    }

    let counters = dispatcher.counters();
    info!(
        sent = counters.sent,
        retries = counters.retries_scheduled,
        permanent_failures = counters.permanent_failures,
        "campaign finished"
    );
    println!("{}", serde_json::to_string_pretty(&engine.get(job.id)?)?);
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
