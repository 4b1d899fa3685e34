//! # bcast-engine — Orchestration Engine
//!
//! Drives a broadcast job through its phases. Each working phase has
//! one [`PhaseHandler`]; the engine selects it by exhaustive match on
//! the phase enum, runs it against the job's workspace, validates the
//! requested transition against the phase table, and commits through
//! the [`JobRepository`] boundary, which re-validates the write.
//!
//! Pause snapshots the job's dispatcher; resume restores it verbatim.
//! Cancellation stops new dispatch immediately.

pub mod engine;
pub mod handler;
pub mod repo;

pub use engine::{Engine, EngineError};
pub use handler::{
    handler_for, JobWorkspace, PhaseHandler, PhaseOutcome, PhaseServices,
};
pub use repo::{InMemoryJobRepository, JobRepository, RepoError};
