//! # Consent Event Log
//!
//! Consent is an append-only event log, never a mutable flag. The store
//! keeps every event and materializes a latest-event view per identity
//! and scope for O(1) reads.
//!
//! Resolution rule: the most recent event wins. An opt-in overrides an
//! opt-out only when strictly newer; at equal timestamps the opt-out
//! wins. Absence of any event means no consent.
//!
//! Scopes: `All` covers every send category; `Marketing` covers only
//! marketing and promotional sends (written by the STOP PROMO keyword),
//! leaving transactional delivery untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use bcast_core::{PhoneE164, SendCategory, Timestamp};

// ─── Events ──────────────────────────────────────────────────────────

/// Direction of a consent event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentAction {
    /// The contact granted consent.
    OptIn,
    /// The contact withdrew consent.
    OptOut,
}

/// Which sends a consent event covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentScope {
    /// All send categories.
    All,
    /// Marketing and promotional sends only.
    Marketing,
}

/// One immutable entry in the consent log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentEvent {
    /// The identity the event is about.
    pub phone: PhoneE164,
    /// Opt-in or opt-out.
    pub action: ConsentAction,
    /// Which sends the event covers.
    pub scope: ConsentScope,
    /// Where the event came from (e.g. "keyword", "signup_form").
    pub source: String,
    /// When the event occurred.
    pub at: Timestamp,
}

/// The resolved consent state for one identity and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    /// Latest relevant event is an opt-in.
    OptedIn,
    /// Latest relevant event is an opt-out.
    OptedOut,
    /// No event on record.
    NoRecord,
}

// ─── Store Trait ─────────────────────────────────────────────────────

/// Read/write handle to the consent log.
pub trait ConsentStore {
    /// Append an event and update the materialized view.
    fn record(&mut self, event: ConsentEvent);

    /// Resolve the consent state for a category.
    fn state(&self, phone: &PhoneE164, category: SendCategory) -> ConsentState;
}

// ─── In-Memory Store ─────────────────────────────────────────────────

/// Latest event per scope for one identity.
#[derive(Debug, Clone, Default)]
struct ConsentView {
    all: Option<(Timestamp, ConsentAction)>,
    marketing: Option<(Timestamp, ConsentAction)>,
}

/// Replace `slot` if the event is strictly newer, or ties as an opt-out.
fn fold_latest(slot: &mut Option<(Timestamp, ConsentAction)>, at: Timestamp, action: ConsentAction) {
    let replace = match slot {
        None => true,
        Some((cur_at, _)) if at > *cur_at => true,
        Some((cur_at, _)) => at == *cur_at && action == ConsentAction::OptOut,
    };
    if replace {
        *slot = Some((at, action));
    }
}

/// Pick the newer of two resolved slots; at equal timestamps the
/// opt-out wins.
fn merge_scopes(
    a: Option<(Timestamp, ConsentAction)>,
    b: Option<(Timestamp, ConsentAction)>,
) -> Option<(Timestamp, ConsentAction)> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if x.0 > y.0 {
                Some(x)
            } else if y.0 > x.0 {
                Some(y)
            } else if x.1 == ConsentAction::OptOut {
                Some(x)
            } else {
                Some(y)
            }
        }
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

/// In-memory consent store: full log plus materialized view.
#[derive(Debug, Default)]
pub struct InMemoryConsentStore {
    log: Vec<ConsentEvent>,
    view: HashMap<PhoneE164, ConsentView>,
}

impl InMemoryConsentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full event history, in append order.
    pub fn log(&self) -> &[ConsentEvent] {
        &self.log
    }
}

impl ConsentStore for InMemoryConsentStore {
    fn record(&mut self, event: ConsentEvent) {
        let view = self.view.entry(event.phone.clone()).or_default();
        match event.scope {
            ConsentScope::All => fold_latest(&mut view.all, event.at, event.action),
            ConsentScope::Marketing => fold_latest(&mut view.marketing, event.at, event.action),
        }
        self.log.push(event);
    }

    fn state(&self, phone: &PhoneE164, category: SendCategory) -> ConsentState {
        let Some(view) = self.view.get(phone) else {
            return ConsentState::NoRecord;
        };
        let effective = match category {
            // Marketing-scope events apply on top of all-scope ones.
            SendCategory::Marketing | SendCategory::Promotional => {
                merge_scopes(view.all, view.marketing)
            }
            SendCategory::Transactional => view.all,
        };
        match effective {
            Some((_, ConsentAction::OptIn)) => ConsentState::OptedIn,
            Some((_, ConsentAction::OptOut)) => ConsentState::OptedOut,
            None => ConsentState::NoRecord,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
