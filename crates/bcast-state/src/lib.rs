//! # bcast-state — Broadcast Lifecycle State Machines
//!
//! Implements the state machines of the broadcast stack as enums with
//! validated transitions. Invalid transitions are rejected at runtime with
//! structured errors and leave state unchanged.
//!
//! ## State Machines
//!
//! - **Phase** (`phase.rs`): the 12-phase broadcast job lifecycle with its
//!   static allowed-transition table. The table is the single transition
//!   authority — the engine, the repository layer, and the CLI all consult
//!   the same edges.
//!
//! - **Job** (`job.rs`): the `BroadcastJob` aggregate — counters,
//!   summaries, audit log — whose only phase mutation path is
//!   `transition()`, which validates against the table.
//!
//! - **Template** (`template.rs`): template approval lifecycle
//!   (Draft → Pending → Approved/Rejected, with soft deletion). Only an
//!   approved template may back a job entering READY_TO_SEND.
//!
//! ## Design
//!
//! With 12 phases and branching edges, a full typestate approach would
//! require a dozen zero-sized types and impl blocks per aggregate. The
//! enum approach with `transition()` returning `Result` rejects invalid
//! transitions at runtime, which fits a machine whose edges are data
//! (the storage boundary consults the same table), not just control
//! flow.

pub mod job;
pub mod phase;
pub mod template;

pub use job::{
    BroadcastJob, ContactCounts, DeliveryCounters, JobError, PhaseTransitionRecord, StatusReason,
};
pub use phase::BroadcastPhase;
pub use template::{
    Template, TemplateCategory, TemplateComponent, TemplateError, TemplateStatus,
};
