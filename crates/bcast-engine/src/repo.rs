//! # Job Repository
//!
//! The storage boundary for job records. Phase writes are re-validated
//! here against the transition table, independently of the validation
//! the job itself performs: a caller holding a stale or hand-edited
//! record cannot persist an illegal phase jump.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use bcast_core::JobId;
use bcast_state::{BroadcastJob, BroadcastPhase, JobError, StatusReason};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors at the storage boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoError {
    /// No record with that id.
    #[error("job {job_id} not found")]
    NotFound {
        /// The missing id.
        job_id: JobId,
    },

    /// A record with that id already exists.
    #[error("job {job_id} already exists")]
    AlreadyExists {
        /// The conflicting id.
        job_id: JobId,
    },

    /// The write would commit a phase change the table does not allow.
    #[error("job {job_id}: illegal phase write {from} -> {to}")]
    InvalidPhaseWrite {
        /// The job being written.
        job_id: JobId,
        /// The stored phase.
        from: BroadcastPhase,
        /// The phase the write carried.
        to: BroadcastPhase,
    },
}

// ─── Trait ───────────────────────────────────────────────────────────

/// Storage handle for job records.
pub trait JobRepository {
    /// Persist a new job. The id must be unused.
    fn create(&mut self, job: BroadcastJob) -> Result<(), RepoError>;

    /// Load a job by id.
    fn get(&self, job_id: JobId) -> Result<BroadcastJob, RepoError>;

    /// Transition the stored record and persist it. The stored record
    /// is the authority; the transition is validated against it.
    fn update_phase(
        &mut self,
        job_id: JobId,
        to: BroadcastPhase,
        reason: StatusReason,
    ) -> Result<BroadcastJob, RepoError>;

    /// Persist a full record over its stored version. The phase may
    /// stay equal or move along one table edge; anything else is
    /// rejected.
    fn save(&mut self, job: BroadcastJob) -> Result<(), RepoError>;

    /// Jobs currently in the given phase, in creation order.
    fn list_by_status(&self, phase: BroadcastPhase) -> Vec<JobId>;
}

// ─── In-Memory Implementation ────────────────────────────────────────

/// HashMap-backed repository for tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: HashMap<JobId, BroadcastJob>,
    order: Vec<JobId>,
}

impl InMemoryJobRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn create(&mut self, job: BroadcastJob) -> Result<(), RepoError> {
        if self.jobs.contains_key(&job.id) {
            return Err(RepoError::AlreadyExists { job_id: job.id });
        }
        self.order.push(job.id);
        self.jobs.insert(job.id, job);
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Result<BroadcastJob, RepoError> {
        self.jobs
            .get(&job_id)
            .cloned()
            .ok_or(RepoError::NotFound { job_id })
    }

    fn update_phase(
        &mut self,
        job_id: JobId,
        to: BroadcastPhase,
        reason: StatusReason,
    ) -> Result<BroadcastJob, RepoError> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(RepoError::NotFound { job_id })?;
        let from = job.phase;
        job.transition(to, reason)
            .map_err(|e: JobError| match e {
                JobError::InvalidTransition { .. } | JobError::TerminalPhase { .. } => {
                    RepoError::InvalidPhaseWrite { job_id, from, to }
                }
            })?;
        Ok(job.clone())
    }

    fn save(&mut self, job: BroadcastJob) -> Result<(), RepoError> {
        let stored = self
            .jobs
            .get(&job.id)
            .ok_or(RepoError::NotFound { job_id: job.id })?;
        let legal = stored.phase == job.phase || stored.phase.can_transition_to(job.phase);
        if !legal {
            return Err(RepoError::InvalidPhaseWrite {
                job_id: job.id,
                from: stored.phase,
                to: job.phase,
            });
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    fn list_by_status(&self, phase: BroadcastPhase) -> Vec<JobId> {
        self.order
            .iter()
            .filter(|id| self.jobs.get(id).map_or(false, |j| j.phase == phase))
            .copied()
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
