//! # Inbound Keyword Handler
//!
//! Maps regulatory keywords in inbound messages to consent and
//! suppression effects:
//!
//! | Keyword            | Effect                                              |
//! |--------------------|-----------------------------------------------------|
//! | STOP / UNSUBSCRIBE | opt-out event + global suppression                  |
//! | PAUSE              | opt-out event + temporary suppression (30 days)     |
//! | STOP PROMO         | marketing-only opt-out event                        |
//! | START              | opt-in event + clears keyword-written suppressions  |
//!
//! Effects go through the injected stores, so they are visible to the
//! next compliance check of any job sharing those stores. Free-text
//! messages that are not keywords parse to `None` and have no
//! compliance effect.

use tracing::info;

use bcast_core::{PhoneE164, Timestamp};

use crate::consent::{ConsentAction, ConsentEvent, ConsentScope, ConsentStore};
use crate::suppression::{SuppressionEntry, SuppressionScope, SuppressionSource, SuppressionStore};

/// How long a PAUSE suppression lasts.
pub const TEMPORARY_SUPPRESSION_SECS: i64 = 30 * 86_400;

/// A recognized inbound keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKeyword {
    /// Permanent opt-out.
    Stop,
    /// Permanent opt-out (alias).
    Unsubscribe,
    /// Temporary opt-out.
    Pause,
    /// Marketing-only opt-out.
    StopPromo,
    /// Re-subscribe.
    Start,
}

impl InboundKeyword {
    /// Parse an inbound message body. Case-insensitive; surrounding and
    /// internal whitespace is normalized. Non-keyword text is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match normalized.as_str() {
            "STOP" => Some(Self::Stop),
            "UNSUBSCRIBE" => Some(Self::Unsubscribe),
            "PAUSE" => Some(Self::Pause),
            "STOP PROMO" => Some(Self::StopPromo),
            "START" => Some(Self::Start),
            _ => None,
        }
    }
}

/// Apply a keyword's consent and suppression effects.
pub fn apply_keyword<C: ConsentStore, S: SuppressionStore>(
    consent: &mut C,
    suppression: &mut S,
    phone: &PhoneE164,
    keyword: InboundKeyword,
    now: Timestamp,
) {
    info!(phone = %phone, keyword = ?keyword, "applying inbound keyword");
    let event = |action: ConsentAction, scope: ConsentScope| ConsentEvent {
        phone: phone.clone(),
        action,
        scope,
        source: "keyword".to_string(),
        at: now,
    };
    let entry = |scope: SuppressionScope, expires_at: Option<Timestamp>| SuppressionEntry {
        phone: phone.clone(),
        scope,
        source: SuppressionSource::Keyword,
        created_at: now,
        expires_at,
    };

    match keyword {
        InboundKeyword::Stop | InboundKeyword::Unsubscribe => {
            consent.record(event(ConsentAction::OptOut, ConsentScope::All));
            suppression.add(entry(SuppressionScope::Global, None));
        }
        InboundKeyword::Pause => {
            consent.record(event(ConsentAction::OptOut, ConsentScope::All));
            suppression.add(entry(
                SuppressionScope::Temporary,
                Some(now.plus_secs(TEMPORARY_SUPPRESSION_SECS)),
            ));
        }
        InboundKeyword::StopPromo => {
            consent.record(event(ConsentAction::OptOut, ConsentScope::Marketing));
        }
        InboundKeyword::Start => {
            consent.record(event(ConsentAction::OptIn, ConsentScope::All));
            suppression.clear_keyword_entries(phone);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::{ConsentState, InMemoryConsentStore};
    use crate::suppression::InMemorySuppressionStore;
    use bcast_core::{JobId, SendCategory};

    fn phone() -> PhoneE164 {
        PhoneE164::parse("+919876543210").unwrap()
    }

    fn at(iso: &str) -> Timestamp {
        Timestamp::parse(iso).unwrap()
    }

    #[test]
    fn test_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(InboundKeyword::parse("stop"), Some(InboundKeyword::Stop));
        assert_eq!(InboundKeyword::parse("  STOP  "), Some(InboundKeyword::Stop));
        assert_eq!(
            InboundKeyword::parse("stop   promo"),
            Some(InboundKeyword::StopPromo)
        );
        assert_eq!(
            InboundKeyword::parse("Unsubscribe"),
            Some(InboundKeyword::Unsubscribe)
        );
        assert_eq!(InboundKeyword::parse("please stop"), None);
        assert_eq!(InboundKeyword::parse("hello"), None);
    }

    #[test]
    fn test_stop_opts_out_and_suppresses_globally() {
        let mut consent = InMemoryConsentStore::new();
        let mut suppression = InMemorySuppressionStore::new();
        let now = at("2026-03-01T12:00:00Z");
        apply_keyword(&mut consent, &mut suppression, &phone(), InboundKeyword::Stop, now);

        assert_eq!(
            consent.state(&phone(), SendCategory::Transactional),
            ConsentState::OptedOut
        );
        assert_eq!(
            suppression.active_scope(&phone(), JobId::new(), now),
            Some(SuppressionScope::Global)
        );
    }

    #[test]
    fn test_pause_suppression_expires_after_30_days() {
        let mut consent = InMemoryConsentStore::new();
        let mut suppression = InMemorySuppressionStore::new();
        let now = at("2026-03-01T12:00:00Z");
        apply_keyword(&mut consent, &mut suppression, &phone(), InboundKeyword::Pause, now);

        let job = JobId::new();
        assert_eq!(
            suppression.active_scope(&phone(), job, now.plus_secs(29 * 86_400)),
            Some(SuppressionScope::Temporary)
        );
        assert_eq!(
            suppression.active_scope(&phone(), job, now.plus_secs(TEMPORARY_SUPPRESSION_SECS)),
            None
        );
    }

    #[test]
    fn test_stop_promo_leaves_transactional_alone() {
        let mut consent = InMemoryConsentStore::new();
        let mut suppression = InMemorySuppressionStore::new();
        let now = at("2026-03-01T12:00:00Z");
        consent.record(ConsentEvent {
            phone: phone(),
            action: ConsentAction::OptIn,
            scope: ConsentScope::All,
            source: "signup_form".to_string(),
            at: at("2026-01-01T00:00:00Z"),
        });
        apply_keyword(&mut consent, &mut suppression, &phone(), InboundKeyword::StopPromo, now);

        assert_eq!(
            consent.state(&phone(), SendCategory::Marketing),
            ConsentState::OptedOut
        );
        assert_eq!(
            consent.state(&phone(), SendCategory::Transactional),
            ConsentState::OptedIn
        );
        // No suppression entry written.
        assert_eq!(suppression.active_scope(&phone(), JobId::new(), now), None);
    }

    #[test]
    fn test_start_restores_after_stop() {
        let mut consent = InMemoryConsentStore::new();
        let mut suppression = InMemorySuppressionStore::new();
        let stop_at = at("2026-03-01T12:00:00Z");
        apply_keyword(&mut consent, &mut suppression, &phone(), InboundKeyword::Stop, stop_at);

        let start_at = at("2026-03-05T12:00:00Z");
        apply_keyword(&mut consent, &mut suppression, &phone(), InboundKeyword::Start, start_at);

        assert_eq!(
            consent.state(&phone(), SendCategory::Marketing),
            ConsentState::OptedIn
        );
        assert_eq!(
            suppression.active_scope(&phone(), JobId::new(), start_at),
            None
        );
    }
}
