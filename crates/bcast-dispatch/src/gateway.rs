//! # Messaging Gateway
//!
//! The provider boundary: one trait with the six verbs the stack needs,
//! returning normalized results that carry the provider's numeric error
//! code on rejection.
//!
//! Error-code classification is a fixed table. Unknown codes default to
//! retryable: a transient we have not catalogued yet costs a few wasted
//! retries, whereas misclassifying a new permanent code would drop
//! messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bcast_core::{ContactId, MessagingTier, PhoneE164, QualityRating, TemplateId};
use bcast_state::{Template, TemplateStatus};

// ─── Error Classification ────────────────────────────────────────────

/// Provider codes that no number of retries will fix.
pub const NON_RETRYABLE_CODES: [u32; 4] = [131_026, 131_047, 131_051, 131_031];

/// Provider codes documented as transient.
pub const RETRYABLE_CODES: [u32; 2] = [131_053, 130_429];

/// How a rejection should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Worth another attempt on the retry schedule.
    Retryable,
    /// Permanent for this message.
    NonRetryable,
}

/// Classify a provider error code. Unknown codes are retryable.
pub fn classify_code(code: u32) -> ErrorClass {
    if NON_RETRYABLE_CODES.contains(&code) {
        ErrorClass::NonRetryable
    } else {
        ErrorClass::Retryable
    }
}

// ─── Results ─────────────────────────────────────────────────────────

/// A gateway verb failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendError {
    /// The provider rejected the request with a numeric code.
    #[error("provider rejected with code {code}")]
    Rejected {
        /// The provider's error code.
        code: u32,
    },

    /// The request timed out in transit.
    #[error("provider request timed out")]
    Timeout,
}

impl SendError {
    /// Classification of this failure. Timeouts are transient.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Rejected { code } => classify_code(*code),
            Self::Timeout => ErrorClass::Retryable,
        }
    }
}

/// Acknowledgement of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// The provider's message identifier.
    pub provider_message_id: String,
}

/// Provider-reported account standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Quality rating.
    pub rating: QualityRating,
    /// Messaging tier.
    pub tier: MessagingTier,
}

/// One message handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The target contact.
    pub contact_id: ContactId,
    /// The target identity.
    pub phone: PhoneE164,
    /// The approved template to render.
    pub template_id: TemplateId,
}

// ─── Trait ───────────────────────────────────────────────────────────

/// The provider boundary.
pub trait MessagingGateway {
    /// Submit a template for provider review; returns the provider's
    /// reference for it.
    fn submit_template(&mut self, template: &Template) -> Result<String, SendError>;

    /// Poll the review status of a previously submitted template.
    fn template_status(&mut self, provider_ref: &str) -> Result<TemplateStatus, SendError>;

    /// Send on the reduced-cost path (inside the contact's free window).
    fn send_reduced_cost(&mut self, message: &OutboundMessage)
        -> Result<DeliveryReceipt, SendError>;

    /// Send on the full-cost path.
    fn send_full(&mut self, message: &OutboundMessage) -> Result<DeliveryReceipt, SendError>;

    /// Mark an inbound message as read.
    fn mark_read(&mut self, provider_message_id: &str) -> Result<(), SendError>;

    /// Current account standing.
    fn account_health(&mut self) -> Result<HealthReport, SendError>;
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_non_retryable_codes() {
        for code in NON_RETRYABLE_CODES {
            assert_eq!(classify_code(code), ErrorClass::NonRetryable);
        }
    }

    #[test]
    fn test_known_retryable_codes() {
        for code in RETRYABLE_CODES {
            assert_eq!(classify_code(code), ErrorClass::Retryable);
        }
    }

    #[test]
    fn test_unknown_codes_default_to_retryable() {
        assert_eq!(classify_code(0), ErrorClass::Retryable);
        assert_eq!(classify_code(999_999), ErrorClass::Retryable);
    }

    #[test]
    fn test_timeout_is_retryable() {
        assert_eq!(SendError::Timeout.class(), ErrorClass::Retryable);
    }

    #[test]
    fn test_rejection_class_follows_code() {
        assert_eq!(
            SendError::Rejected { code: 131_026 }.class(),
            ErrorClass::NonRetryable
        );
        assert_eq!(
            SendError::Rejected { code: 130_429 }.class(),
            ErrorClass::Retryable
        );
    }
}
