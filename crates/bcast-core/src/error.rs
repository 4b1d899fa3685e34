//! # Error Types
//!
//! Errors for the foundational types. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations. Domain crates
//! define their own error enums and convert from these where needed;
//! per-contact validation problems are collected into summaries, never
//! propagated as job failures.

use thiserror::Error;

/// Errors raised by the foundational types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A phone number failed the canonical E.164 shape check.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// A timestamp string could not be parsed or used a non-UTC offset.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A string did not match any variant of a closed enum.
    #[error("unknown value: {0}")]
    UnknownValue(String),
}
