//! # Deduplication Engine
//!
//! Four cascaded matching stages, applied in order, each operating only on
//! contacts not already marked by an earlier stage:
//!
//! 1. **Exact** — identical uploaded phone strings within the batch.
//! 2. **Normalized** — identical canonical E.164 identities not already
//!    caught by the exact stage.
//! 3. **Fuzzy** — edit distance ≤ 1 on the canonical digits (substitution,
//!    insertion, deletion, or adjacent transposition), compared only
//!    within a shared country code to bound the pairwise cost.
//! 4. **Cross-campaign** — identity already present in the owner's seen
//!    set from prior jobs.
//!
//! Determinism: given the same input ordering, duplicate designation is
//! identical on every run. The first occurrence wins; ties break by input
//! order. Canonical contacts are never themselves marked duplicate.
//!
//! Cross-country number portability can move a number between prefixes,
//! so the same-country bound on the fuzzy stage can miss such duplicates.
//! The bound is kept anyway: it is what makes the stage affordable on
//! large batches.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use bcast_core::{ContactId, PhoneE164};

use crate::normalize::ProcessedContact;

// ─── Stages & Marks ──────────────────────────────────────────────────

/// The dedup stage that caught a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStage {
    /// Identical uploaded strings.
    Exact,
    /// Identical canonical identities.
    Normalized,
    /// Canonical digits within one edit, same country.
    Fuzzy,
    /// Identity seen in a prior job of the same owner.
    CrossCampaign,
}

impl DuplicateStage {
    /// Snake_case identifier, matching the serde format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
            Self::CrossCampaign => "cross_campaign",
        }
    }
}

impl std::fmt::Display for DuplicateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mark placed on a duplicate contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMark {
    /// Which stage caught it.
    pub stage: DuplicateStage,
    /// The first-seen contact it duplicates, when the canonical contact
    /// is in this batch. `None` for cross-campaign duplicates, whose
    /// canonical contact lives in a prior job.
    pub duplicate_of: Option<ContactId>,
    /// The canonical identity this contact collapsed into.
    pub canonical_phone: PhoneE164,
}

/// Per-stage duplicate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupSummary {
    /// Stage 1 count.
    pub exact: u32,
    /// Stage 2 count.
    pub normalized: u32,
    /// Stage 3 count.
    pub fuzzy: u32,
    /// Stage 4 count.
    pub cross_campaign: u32,
}

impl DedupSummary {
    /// Total duplicates across all stages.
    pub fn total(&self) -> u32 {
        self.exact + self.normalized + self.fuzzy + self.cross_campaign
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

/// The 4-stage deduplication engine.
#[derive(Debug, Default)]
pub struct DedupEngine;

impl DedupEngine {
    /// Create a dedup engine.
    pub fn new() -> Self {
        Self
    }

    /// Run all four stages over `contacts` in place.
    ///
    /// `seen` is the set of canonical identities from all prior jobs of
    /// the same owner. Returns per-stage counts.
    pub fn run(
        &self,
        contacts: &mut [ProcessedContact],
        seen: &HashSet<PhoneE164>,
    ) -> DedupSummary {
        let mut summary = DedupSummary::default();
        summary.exact = self.stage_exact(contacts);
        summary.normalized = self.stage_normalized(contacts);
        summary.fuzzy = self.stage_fuzzy(contacts);
        summary.cross_campaign = self.stage_cross_campaign(contacts, seen);
        debug!(
            exact = summary.exact,
            normalized = summary.normalized,
            fuzzy = summary.fuzzy,
            cross_campaign = summary.cross_campaign,
            "dedup cascade complete"
        );
        summary
    }

    /// Stage 1: identical uploaded strings.
    fn stage_exact(&self, contacts: &mut [ProcessedContact]) -> u32 {
        let mut first_seen: HashMap<String, (ContactId, PhoneE164)> = HashMap::new();
        let mut count = 0;
        for contact in contacts.iter_mut() {
            match first_seen.get(&contact.source_phone) {
                Some((canonical_id, canonical_phone)) => {
                    contact.duplicate = Some(DuplicateMark {
                        stage: DuplicateStage::Exact,
                        duplicate_of: Some(*canonical_id),
                        canonical_phone: canonical_phone.clone(),
                    });
                    count += 1;
                }
                None => {
                    first_seen.insert(
                        contact.source_phone.clone(),
                        (contact.id, contact.phone.clone()),
                    );
                }
            }
        }
        count
    }

    /// Stage 2: identical canonical identities not caught by stage 1.
    fn stage_normalized(&self, contacts: &mut [ProcessedContact]) -> u32 {
        let mut first_seen: HashMap<PhoneE164, ContactId> = HashMap::new();
        let mut count = 0;
        for contact in contacts.iter_mut() {
            if contact.is_duplicate() {
                continue;
            }
            match first_seen.get(&contact.phone) {
                Some(canonical_id) => {
                    contact.duplicate = Some(DuplicateMark {
                        stage: DuplicateStage::Normalized,
                        duplicate_of: Some(*canonical_id),
                        canonical_phone: contact.phone.clone(),
                    });
                    count += 1;
                }
                None => {
                    first_seen.insert(contact.phone.clone(), contact.id);
                }
            }
        }
        count
    }

    /// Stage 3: within-one-edit canonical digits, same country only.
    ///
    /// Pairwise within each country. For each unmarked contact we scan
    /// the unmarked contacts before it in input order and attach to the
    /// first within one edit — first occurrence wins, so the designation
    /// is order-stable.
    fn stage_fuzzy(&self, contacts: &mut [ProcessedContact]) -> u32 {
        let mut count = 0;
        for j in 0..contacts.len() {
            if contacts[j].is_duplicate() {
                continue;
            }
            let mut mark: Option<DuplicateMark> = None;
            for i in 0..j {
                if contacts[i].is_duplicate() {
                    continue;
                }
                if contacts[i].country != contacts[j].country {
                    continue;
                }
                if within_one_edit(contacts[i].phone.digits(), contacts[j].phone.digits()) {
                    mark = Some(DuplicateMark {
                        stage: DuplicateStage::Fuzzy,
                        duplicate_of: Some(contacts[i].id),
                        canonical_phone: contacts[i].phone.clone(),
                    });
                    break;
                }
            }
            if let Some(mark) = mark {
                contacts[j].duplicate = Some(mark);
                count += 1;
            }
        }
        count
    }

    /// Stage 4: identity already present in the owner's prior-job set.
    fn stage_cross_campaign(
        &self,
        contacts: &mut [ProcessedContact],
        seen: &HashSet<PhoneE164>,
    ) -> u32 {
        let mut count = 0;
        for contact in contacts.iter_mut() {
            if contact.is_duplicate() {
                continue;
            }
            if seen.contains(&contact.phone) {
                contact.duplicate = Some(DuplicateMark {
                    stage: DuplicateStage::CrossCampaign,
                    duplicate_of: None,
                    canonical_phone: contact.phone.clone(),
                });
                count += 1;
            }
        }
        count
    }
}

/// Whether two digit strings are within one edit of each other:
/// equal, one substitution, one insertion/deletion, or one adjacent
/// transposition.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a == b {
        return true;
    }
    match a.len() as i64 - b.len() as i64 {
        0 => {
            // One substitution, or one adjacent transposition.
            let mismatches: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
            match mismatches.as_slice() {
                [_] => true,
                [i, j] => *j == *i + 1 && a[*i] == b[*j] && a[*j] == b[*i],
                _ => false,
            }
        }
        1 => one_deletion(a, b),
        -1 => one_deletion(b, a),
        _ => false,
    }
}

/// Whether deleting exactly one byte from `longer` yields `shorter`.
fn one_deletion(longer: &[u8], shorter: &[u8]) -> bool {
    debug_assert_eq!(longer.len(), shorter.len() + 1);
    let mut i = 0;
    let mut skipped = false;
    let mut j = 0;
    while i < longer.len() && j < shorter.len() {
        if longer[i] == shorter[j] {
            i += 1;
            j += 1;
        } else if skipped {
            return false;
        } else {
            skipped = true;
            i += 1;
        }
    }
    true
}

// ─── Tests ───────────────────────────────────────────────────────────
