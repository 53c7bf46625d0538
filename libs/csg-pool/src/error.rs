//! # Pool Errors
//!
//! Error types surfaced to callers of the pool.
//!
//! Pool-level failures ([`PoolError::Disposed`], [`PoolError::InitFailed`])
//! reject every dispatch; [`PoolError::JobFailed`] and
//! [`PoolError::WorkerTerminated`] reject only the job concerned.

use csg_tree::{JobId, ProtocolError};
use mesh_builder::MeshError;
use thiserror::Error;

/// Errors that can occur while dispatching jobs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolError {
    /// The pool was disposed.
    #[error("Pool has been disposed")]
    Disposed,

    /// No worker finished initialization.
    #[error("Worker initialization failed: {0}")]
    InitFailed(String),

    /// Every worker has terminated.
    #[error("No workers available")]
    NoWorkers,

    /// The worker holding the job exited first.
    #[error("Worker terminated before job {job} completed")]
    WorkerTerminated { job: JobId },

    /// The worker reported a failure.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// The pool task is gone.
    #[error("Pool channel closed")]
    ChannelClosed,

    /// The job failed client-side validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A builder leaf could not be finalized.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

// =============================================================================
// TESTS
// =============================================================================
