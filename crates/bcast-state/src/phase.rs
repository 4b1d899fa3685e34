//! # Broadcast Phase Machine
//!
//! The 12 phases of a broadcast job and the allowed-transition table.
//!
//! ```text
//! INITIALIZED ──▶ DATA_PROCESSING ──▶ COMPLIANCE_CHECK ──▶ SEGMENTATION
//!                      │                    │                   │
//!                      ▼                    ▼                   ▼
//!                    FAILED              FAILED          CONTENT_CREATION
//!                                                          │        │
//!                                              ┌───────────┘        ▼
//!                                              ▼              PENDING_APPROVAL
//!                                       READY_TO_SEND ◀──────────┤ │ │
//!                                         │       │              │ │ ▼
//!                                         ▼       ▼   (rework)───┘ FAILED
//!                                      SENDING  CANCELLED
//!                                      │  │  │
//!                                      ▼  ▼  ▼
//!                              COMPLETED PAUSED FAILED
//!                                         │  │
//!                                         ▼  ▼
//!                                   SENDING  CANCELLED
//! ```
//!
//! The table is the single transition authority. `BroadcastJob`, the
//! orchestration engine, and the repository boundary all validate against
//! these edges — no component may commit a transition the table lacks.
//! PAUSED is the only state re-entrant into SENDING.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use bcast_core::CoreError;

/// A phase in the broadcast job lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastPhase {
    /// Job created, nothing processed yet.
    Initialized,
    /// Contact ingestion, dedup, and scoring in progress.
    DataProcessing,
    /// Consent, suppression, time-window, and health checks in progress.
    ComplianceCheck,
    /// Lifecycle, free-window, timezone, and frequency segmentation.
    Segmentation,
    /// Template selection or creation.
    ContentCreation,
    /// Selected template awaiting provider approval.
    PendingApproval,
    /// Approved and eligible to start dispatch.
    ReadyToSend,
    /// Dispatcher actively sending.
    Sending,
    /// Dispatch frozen; queue and retry timers persisted verbatim.
    Paused,
    /// All dispatch attempts resolved (terminal).
    Completed,
    /// Job-level structural failure (terminal).
    Failed,
    /// Cancelled before or during dispatch (terminal).
    Cancelled,
}

impl BroadcastPhase {
    /// All phases in lifecycle order.
    pub fn all() -> &'static [BroadcastPhase] {
        &[
            Self::Initialized,
            Self::DataProcessing,
            Self::ComplianceCheck,
            Self::Segmentation,
            Self::ContentCreation,
            Self::PendingApproval,
            Self::ReadyToSend,
            Self::Sending,
            Self::Paused,
            Self::Completed,
            Self::Failed,
            Self::Cancelled,
        ]
    }

    /// The phases this phase may legally transition to.
    ///
    /// Terminal phases return an empty slice.
    pub fn allowed_targets(&self) -> &'static [BroadcastPhase] {
        match self {
            Self::Initialized => &[Self::DataProcessing],
            Self::DataProcessing => &[Self::ComplianceCheck, Self::Failed],
            Self::ComplianceCheck => &[Self::Segmentation, Self::Failed],
            Self::Segmentation => &[Self::ContentCreation],
            Self::ContentCreation => &[Self::PendingApproval, Self::ReadyToSend],
            Self::PendingApproval => &[Self::ReadyToSend, Self::ContentCreation, Self::Failed],
            Self::ReadyToSend => &[Self::Sending, Self::Cancelled],
            Self::Sending => &[Self::Completed, Self::Paused, Self::Failed],
            Self::Paused => &[Self::Sending, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Whether `to` is a legal transition target from this phase.
    pub fn can_transition_to(&self, to: BroadcastPhase) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Whether this phase is terminal (no outgoing edges).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// SCREAMING_SNAKE identifier, matching the persisted `phase` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "INITIALIZED",
            Self::DataProcessing => "DATA_PROCESSING",
            Self::ComplianceCheck => "COMPLIANCE_CHECK",
            Self::Segmentation => "SEGMENTATION",
            Self::ContentCreation => "CONTENT_CREATION",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::ReadyToSend => "READY_TO_SEND",
            Self::Sending => "SENDING",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BroadcastPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BroadcastPhase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZED" => Ok(Self::Initialized),
            "DATA_PROCESSING" => Ok(Self::DataProcessing),
            "COMPLIANCE_CHECK" => Ok(Self::ComplianceCheck),
            "SEGMENTATION" => Ok(Self::Segmentation),
            "CONTENT_CREATION" => Ok(Self::ContentCreation),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "READY_TO_SEND" => Ok(Self::ReadyToSend),
            "SENDING" => Ok(Self::Sending),
            "PAUSED" => Ok(Self::Paused),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(CoreError::UnknownValue(format!(
                "unknown broadcast phase: {other:?}"
            ))),
        }
    }
}
