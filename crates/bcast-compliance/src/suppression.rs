//! # Suppression Lists
//!
//! Scoped do-not-send entries layered on top of consent. An active
//! entry excludes a contact outright, regardless of consent state.
//!
//! Scopes: global (all jobs, indefinitely), campaign (one job only),
//! temporary (time-boxed, written by the PAUSE keyword), and bounce
//! (delivery failures flagged the number as undeliverable). Entries
//! with an expiry stop matching once it passes; expired entries are
//! kept in the store for audit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use bcast_core::{JobId, PhoneE164, Timestamp};

// ─── Entries ─────────────────────────────────────────────────────────

/// What an entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionScope {
    /// Every job of the owner.
    Global,
    /// One specific job.
    Campaign(JobId),
    /// Every job, until the entry expires.
    Temporary,
    /// Every job; the number bounced.
    Bounce,
}

/// Who wrote an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionSource {
    /// The inbound keyword handler.
    Keyword,
    /// A human operator.
    Manual,
    /// Delivery-failure processing.
    System,
}

/// One suppression entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionEntry {
    /// The suppressed identity.
    pub phone: PhoneE164,
    /// What the entry applies to.
    pub scope: SuppressionScope,
    /// Who wrote it.
    pub source: SuppressionSource,
    /// When it was written.
    pub created_at: Timestamp,
    /// When it stops matching, if ever.
    pub expires_at: Option<Timestamp>,
}

impl SuppressionEntry {
    /// Whether this entry suppresses sends for `job_id` at `now`.
    pub fn matches(&self, job_id: JobId, now: Timestamp) -> bool {
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return false;
            }
        }
        match self.scope {
            SuppressionScope::Global | SuppressionScope::Temporary | SuppressionScope::Bounce => {
                true
            }
            SuppressionScope::Campaign(scoped_job) => scoped_job == job_id,
        }
    }
}

// ─── Store Trait ─────────────────────────────────────────────────────

/// Read/write handle to the suppression lists.
pub trait SuppressionStore {
    /// Add an entry.
    fn add(&mut self, entry: SuppressionEntry);

    /// The first active entry suppressing `phone` for `job_id` at `now`,
    /// checked in scope order global, campaign, temporary, bounce.
    fn active_scope(&self, phone: &PhoneE164, job_id: JobId, now: Timestamp)
        -> Option<SuppressionScope>;

    /// Remove keyword-written global and temporary entries for `phone`.
    /// Invoked by the START keyword; manual and bounce entries survive.
    fn clear_keyword_entries(&mut self, phone: &PhoneE164);
}

// ─── In-Memory Store ─────────────────────────────────────────────────

/// In-memory suppression store, entries bucketed by identity.
#[derive(Debug, Default)]
pub struct InMemorySuppressionStore {
    entries: HashMap<PhoneE164, Vec<SuppressionEntry>>,
}

impl InMemorySuppressionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries for an identity, active or not.
    pub fn entries_for(&self, phone: &PhoneE164) -> &[SuppressionEntry] {
        self.entries.get(phone).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SuppressionStore for InMemorySuppressionStore {
    fn add(&mut self, entry: SuppressionEntry) {
        self.entries.entry(entry.phone.clone()).or_default().push(entry);
    }

    fn active_scope(
        &self,
        phone: &PhoneE164,
        job_id: JobId,
        now: Timestamp,
    ) -> Option<SuppressionScope> {
        let entries = self.entries.get(phone)?;
        let rank = |scope: &SuppressionScope| match scope {
            SuppressionScope::Global => 0,
            SuppressionScope::Campaign(_) => 1,
            SuppressionScope::Temporary => 2,
            SuppressionScope::Bounce => 3,
        };
        entries
            .iter()
            .filter(|e| e.matches(job_id, now))
            .min_by_key(|e| rank(&e.scope))
            .map(|e| e.scope)
    }

    fn clear_keyword_entries(&mut self, phone: &PhoneE164) {
        if let Some(entries) = self.entries.get_mut(phone) {
            entries.retain(|e| {
                e.source != SuppressionSource::Keyword
                    || !matches!(
                        e.scope,
                        SuppressionScope::Global | SuppressionScope::Temporary
                    )
            });
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> PhoneE164 {
        PhoneE164::parse("+919876543210").unwrap()
    }

    fn at(iso: &str) -> Timestamp {
        Timestamp::parse(iso).unwrap()
    }

    fn entry(scope: SuppressionScope, source: SuppressionSource) -> SuppressionEntry {
        SuppressionEntry {
            phone: phone(),
            scope,
            source,
            created_at: at("2026-01-01T00:00:00Z"),
            expires_at: None,
        }
    }

    #[test]
    fn test_global_suppresses_every_job() {
        let mut store = InMemorySuppressionStore::new();
        store.add(entry(SuppressionScope::Global, SuppressionSource::Manual));
        let now = at("2026-01-02T00:00:00Z");
        assert_eq!(
            store.active_scope(&phone(), JobId::new(), now),
            Some(SuppressionScope::Global)
        );
        assert_eq!(
            store.active_scope(&phone(), JobId::new(), now),
            Some(SuppressionScope::Global)
        );
    }

    #[test]
    fn test_campaign_scope_matches_only_its_job() {
        let mut store = InMemorySuppressionStore::new();
        let scoped_job = JobId::new();
        store.add(entry(
            SuppressionScope::Campaign(scoped_job),
            SuppressionSource::Manual,
        ));
        let now = at("2026-01-02T00:00:00Z");
        assert_eq!(
            store.active_scope(&phone(), scoped_job, now),
            Some(SuppressionScope::Campaign(scoped_job))
        );
        assert_eq!(store.active_scope(&phone(), JobId::new(), now), None);
    }

    #[test]
    fn test_temporary_entry_expires() {
        let mut store = InMemorySuppressionStore::new();
        let mut e = entry(SuppressionScope::Temporary, SuppressionSource::Keyword);
        e.expires_at = Some(at("2026-01-31T00:00:00Z"));
        store.add(e);
        let job = JobId::new();
        assert_eq!(
            store.active_scope(&phone(), job, at("2026-01-15T00:00:00Z")),
            Some(SuppressionScope::Temporary)
        );
        // Expiry instant itself no longer matches.
        assert_eq!(
            store.active_scope(&phone(), job, at("2026-01-31T00:00:00Z")),
            None
        );
        // Expired entry is retained for audit.
        assert_eq!(store.entries_for(&phone()).len(), 1);
    }

    #[test]
    fn test_scope_ordering_reports_global_first() {
        let mut store = InMemorySuppressionStore::new();
        store.add(entry(SuppressionScope::Bounce, SuppressionSource::System));
        store.add(entry(SuppressionScope::Global, SuppressionSource::Manual));
        assert_eq!(
            store.active_scope(&phone(), JobId::new(), at("2026-01-02T00:00:00Z")),
            Some(SuppressionScope::Global)
        );
    }

    #[test]
    fn test_clear_keyword_entries_spares_manual_and_bounce() {
        let mut store = InMemorySuppressionStore::new();
        store.add(entry(SuppressionScope::Global, SuppressionSource::Keyword));
        store.add(entry(SuppressionScope::Temporary, SuppressionSource::Keyword));
        store.add(entry(SuppressionScope::Global, SuppressionSource::Manual));
        store.add(entry(SuppressionScope::Bounce, SuppressionSource::System));
        store.clear_keyword_entries(&phone());
        let remaining = store.entries_for(&phone());
        assert_eq!(remaining.len(), 2);
        assert!(remaining
            .iter()
            .all(|e| e.source != SuppressionSource::Keyword));
    }

    #[test]
    fn test_unknown_phone_is_not_suppressed() {
        let store = InMemorySuppressionStore::new();
        assert_eq!(
            store.active_scope(&phone(), JobId::new(), at("2026-01-02T00:00:00Z")),
            None
        );
    }
}
