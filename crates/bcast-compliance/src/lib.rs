//! # bcast-compliance — Compliance Gate
//!
//! Everything that decides whether a message may be sent to a contact:
//! the append-only consent event log with its materialized latest-event
//! view, scoped suppression lists, the inbound keyword handler, locale
//! send-time windows, and the 4-check compliance gate that ties them
//! together per job.
//!
//! Stores are injected into the gate through the narrow [`ConsentStore`]
//! and [`SuppressionStore`] traits, never reached through globals. Both
//! in-memory implementations give read-your-writes: an effect recorded
//! through a handle is visible to the next check through the same
//! handle, including checks run by a different job.

pub mod consent;
pub mod gate;
pub mod keywords;
pub mod suppression;
pub mod window;

pub use consent::{
    ConsentAction, ConsentEvent, ConsentScope, ConsentState, ConsentStore, InMemoryConsentStore,
};
pub use gate::{
    AccountHealth, ComplianceGate, ComplianceOutcome, ComplianceVerdict, Deferral, ExclusionCounts,
};
pub use keywords::{apply_keyword, InboundKeyword, TEMPORARY_SUPPRESSION_SECS};
pub use suppression::{
    InMemorySuppressionStore, SuppressionEntry, SuppressionScope, SuppressionSource,
    SuppressionStore,
};
pub use window::{next_window_start, WindowCheck};
