//! # Segment Builder
//!
//! Ties the segmentation pieces together for one job: classifies each
//! compliance-passed contact, drops churned and frequency-capped ones,
//! flags the free-window set, clusters the remainder by timezone, and
//! emits per-stage segments plus the summary blob persisted on the job.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use bcast_contacts::ProcessedContact;
use bcast_core::{ContactId, SendCategory, Timestamp};

use crate::clusters::TimezoneCluster;
use crate::frequency::{CapCheck, FrequencyLedger};
use crate::lifecycle::{classify, ContactActivity, LifecycleStage};

// ─── Output ──────────────────────────────────────────────────────────

/// A named group of contacts sharing a lifecycle stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment name; the stage identifier.
    pub name: String,
    /// The shared stage.
    pub stage: LifecycleStage,
    /// Member contacts, in input order.
    pub contact_ids: Vec<ContactId>,
}

/// Aggregate counts persisted into the job's summary blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationSummary {
    /// Included contacts per stage.
    pub stage_counts: BTreeMap<LifecycleStage, u32>,
    /// Contacts dropped as churned.
    pub churned_excluded: u32,
    /// Contacts dropped at a frequency cap.
    pub frequency_capped: u32,
    /// Contacts eligible for reduced-cost delivery.
    pub free_window_count: u32,
    /// Distinct timezone clusters.
    pub cluster_count: u32,
}

/// Everything the SEGMENTATION phase produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationOutput {
    /// Per-stage segments, band order, empty stages omitted.
    pub segments: Vec<Segment>,
    /// Contacts inside the 24-hour free window.
    pub free_window: Vec<ContactId>,
    /// Timezone clusters over the included contacts.
    pub clusters: Vec<TimezoneCluster>,
    /// Aggregate counts.
    pub summary: SegmentationSummary,
}

// ─── Builder ─────────────────────────────────────────────────────────

/// The segment builder for one job.
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    category: SendCategory,
}

impl SegmentBuilder {
    /// Create a builder for a job sending in the given category.
    pub fn new(category: SendCategory) -> Self {
        Self { category }
    }

    /// Segment the batch.
    ///
    /// `activity` is keyed by contact id; contacts without an entry are
    /// treated as having no interaction history. Duplicate-marked
    /// contacts are skipped.
    pub fn build(
        &self,
        contacts: &[ProcessedContact],
        activity: &HashMap<ContactId, ContactActivity>,
        ledger: &FrequencyLedger,
        now: Timestamp,
    ) -> SegmentationOutput {
        let mut by_stage: BTreeMap<LifecycleStage, Vec<ContactId>> = BTreeMap::new();
        let mut free_window = Vec::new();
        let mut included = Vec::new();
        let mut churned_excluded = 0u32;
        let mut frequency_capped = 0u32;

        for contact in contacts.iter().filter(|c| !c.is_duplicate()) {
            let act = activity.get(&contact.id).copied().unwrap_or_default();
            let stage = classify(&act, now);
            if !stage.is_deliverable() {
                churned_excluded += 1;
                continue;
            }
            if ledger.check(&contact.phone, self.category, now) != CapCheck::Allowed {
                frequency_capped += 1;
                continue;
            }
            if act.inbound_within_24h(now) {
                free_window.push(contact.id);
            }
            by_stage.entry(stage).or_default().push(contact.id);
            included.push((contact.id, contact.country));
        }

        let clusters = TimezoneCluster::build(&included, now);
        let summary = SegmentationSummary {
            stage_counts: by_stage
                .iter()
                .map(|(stage, ids)| (*stage, ids.len() as u32))
                .collect(),
            churned_excluded,
            frequency_capped,
            free_window_count: free_window.len() as u32,
            cluster_count: clusters.len() as u32,
        };
        info!(
            included = included.len(),
            churned = churned_excluded,
            capped = frequency_capped,
            free_window = summary.free_window_count,
            clusters = summary.cluster_count,
            "segmentation complete"
        );

        let segments = by_stage
            .into_iter()
            .map(|(stage, contact_ids)| Segment {
                name: stage.as_str().to_string(),
                stage,
                contact_ids,
            })
            .collect();
        SegmentationOutput {
            segments,
            free_window,
            clusters,
            summary,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
