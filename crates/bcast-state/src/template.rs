//! # Template Approval Lifecycle
//!
//! Message templates go through provider approval before a job can
//! reference them:
//!
//! ```text
//! Draft ──▶ Pending ──▶ Approved ──▶ Deleted (soft, terminal)
//!             │
//!             └──▶ Rejected ──▶ Draft (revision)
//! ```
//!
//! An approved template is immutable except for soft deletion; component
//! edits are only possible in Draft. Jobs entering READY_TO_SEND must
//! reference an Approved template — the engine checks `is_approved()`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bcast_core::{TemplateId, Timestamp};

// ─── Status ──────────────────────────────────────────────────────────

/// Approval status of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    /// Under construction; components editable.
    Draft,
    /// Submitted to the provider, awaiting review.
    Pending,
    /// Approved; usable by jobs, immutable.
    Approved,
    /// Rejected by the provider; revisable back to Draft.
    Rejected,
    /// Soft-deleted (terminal).
    Deleted,
}

impl TemplateStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl std::fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// Regulatory category of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateCategory {
    /// Marketing content.
    Marketing,
    /// Utility/service content.
    Utility,
    /// One-time-password / authentication content.
    Authentication,
}

/// A structural component of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateComponent {
    /// Header text.
    Header {
        /// The header line.
        text: String,
    },
    /// Required body text.
    Body {
        /// The body, possibly with `{{n}}` placeholders.
        text: String,
    },
    /// Footer text.
    Footer {
        /// The footer line.
        text: String,
    },
    /// Quick-reply buttons.
    Buttons {
        /// Button labels in display order.
        labels: Vec<String>,
    },
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by template lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid template transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: TemplateStatus,
        /// Attempted target status.
        to: TemplateStatus,
    },

    /// Attempted to edit components outside Draft.
    #[error("template {template_id} is {status}; components are immutable")]
    Immutable {
        /// The template identifier.
        template_id: TemplateId,
        /// Its current status.
        status: TemplateStatus,
    },
}

// ─── Template ────────────────────────────────────────────────────────

/// A reusable message template with its approval lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique template identifier.
    pub id: TemplateId,
    /// Template name (provider-visible).
    pub name: String,
    /// BCP-47-ish language tag (e.g. "en", "en_US", "hi").
    pub language: String,
    /// Regulatory category.
    pub category: TemplateCategory,
    /// Current approval status.
    pub status: TemplateStatus,
    /// Structural components.
    pub components: Vec<TemplateComponent>,
    /// Provider's rejection reason, if rejected.
    pub rejected_reason: Option<String>,
    /// When the template was created.
    pub created_at: Timestamp,
    /// When the template was submitted for review.
    pub submitted_at: Option<Timestamp>,
    /// When the template was approved.
    pub approved_at: Option<Timestamp>,
}

impl Template {
    /// Create a new Draft template.
    pub fn new_draft(
        name: impl Into<String>,
        language: impl Into<String>,
        category: TemplateCategory,
        components: Vec<TemplateComponent>,
    ) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            language: language.into(),
            category,
            status: TemplateStatus::Draft,
            components,
            rejected_reason: None,
            created_at: Timestamp::now(),
            submitted_at: None,
            approved_at: None,
        }
    }

    /// Replace the components. Only permitted in Draft.
    pub fn set_components(
        &mut self,
        components: Vec<TemplateComponent>,
    ) -> Result<(), TemplateError> {
        if self.status != TemplateStatus::Draft {
            return Err(TemplateError::Immutable {
                template_id: self.id,
                status: self.status,
            });
        }
        self.components = components;
        Ok(())
    }

    /// Submit for provider review (DRAFT → PENDING).
    pub fn submit(&mut self) -> Result<(), TemplateError> {
        self.require(TemplateStatus::Draft, TemplateStatus::Pending)?;
        self.status = TemplateStatus::Pending;
        self.submitted_at = Some(Timestamp::now());
        Ok(())
    }

    /// Record provider approval (PENDING → APPROVED).
    pub fn approve(&mut self) -> Result<(), TemplateError> {
        self.require(TemplateStatus::Pending, TemplateStatus::Approved)?;
        self.status = TemplateStatus::Approved;
        self.approved_at = Some(Timestamp::now());
        Ok(())
    }

    /// Record provider rejection (PENDING → REJECTED).
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), TemplateError> {
        self.require(TemplateStatus::Pending, TemplateStatus::Rejected)?;
        self.status = TemplateStatus::Rejected;
        self.rejected_reason = Some(reason.into());
        Ok(())
    }

    /// Reopen a rejected template for revision (REJECTED → DRAFT).
    pub fn revise(&mut self) -> Result<(), TemplateError> {
        self.require(TemplateStatus::Rejected, TemplateStatus::Draft)?;
        self.status = TemplateStatus::Draft;
        self.rejected_reason = None;
        Ok(())
    }

    /// Soft-delete an approved template (APPROVED → DELETED).
    pub fn soft_delete(&mut self) -> Result<(), TemplateError> {
        self.require(TemplateStatus::Approved, TemplateStatus::Deleted)?;
        self.status = TemplateStatus::Deleted;
        Ok(())
    }

    /// Whether the template is usable by a job entering READY_TO_SEND.
    pub fn is_approved(&self) -> bool {
        self.status == TemplateStatus::Approved
    }

    fn require(
        &self,
        expected: TemplateStatus,
        target: TemplateStatus,
    ) -> Result<(), TemplateError> {
        if self.status != expected {
            return Err(TemplateError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
