//! # bcast-core — Foundational Types
//!
//! Shared primitives for the broadcast orchestration stack. Everything in
//! this crate is a leaf: no other workspace crate is a dependency.
//!
//! ## Modules
//!
//! - **identity** — newtype identifiers (`JobId`, `ContactId`, …) and the
//!   canonical phone key [`PhoneE164`] used for dedup, consent, and
//!   suppression lookups.
//! - **temporal** — [`Timestamp`], UTC-only with seconds precision, so
//!   persisted retry schedules and pause snapshots are byte-for-byte
//!   reproducible.
//! - **country** — the closed [`CountryCode`] set with dialing prefixes,
//!   fixed UTC offsets, and regulatory send windows.
//! - **domain** — [`MessagingTier`], [`QualityRating`], and
//!   [`SendCategory`], shared between the compliance gate and the
//!   dispatcher.
//! - **error** — [`CoreError`], the validation/parse error hierarchy.

pub mod country;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use country::CountryCode;
pub use domain::{MessagingTier, QualityRating, SendCategory};
pub use error::CoreError;
pub use identity::{AccountId, ContactId, JobId, PhoneE164, TemplateId};
pub use temporal::Timestamp;
