//! # bcast-contacts — Contact Ingestion Pipeline
//!
//! The DATA_PROCESSING phase pipeline: parse raw contact records,
//! normalize phone numbers to canonical E.164, deduplicate through the
//! 4-stage cascade, and assign each surviving contact a 0–100 quality
//! score.
//!
//! Per-contact problems are never fatal: malformed entries become
//! [`ValidationError`]s collected into the batch summary, and the job
//! continues with whatever validated.

pub mod dedup;
pub mod normalize;
pub mod score;

pub use dedup::{DedupEngine, DedupSummary, DuplicateMark, DuplicateStage};
pub use normalize::{
    BatchSummary, NormalizedBatch, Normalizer, ProcessedContact, RawContact, ValidationError,
};
pub use score::{EngagementLevel, QualityScorer, ScoreInputs};
