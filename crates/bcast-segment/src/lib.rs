//! # bcast-segment — Segmentation Engine
//!
//! The SEGMENTATION phase: classifies compliance-passed contacts into
//! lifecycle stages, detects the 24-hour free delivery window, clusters
//! contacts by timezone for optimal-band scheduling, and enforces
//! rolling frequency caps. The output is a set of named segments plus a
//! serializable summary persisted into the job record.

pub mod builder;
pub mod clusters;
pub mod frequency;
pub mod lifecycle;

pub use builder::{Segment, SegmentBuilder, SegmentationOutput, SegmentationSummary};
pub use clusters::{next_optimal_band, TimezoneCluster, FREE_WINDOW_SECS};
pub use frequency::{CapCheck, FrequencyLedger, SendRecord, ROLLING_WINDOW_SECS};
pub use lifecycle::{classify, ContactActivity, LifecycleStage};
