//! # Evaluation Errors
//!
//! Error types for job evaluation inside a worker.
//!
//! Every variant is reported back to the pool as a failed job; none of
//! them stops the worker.

use csg_kernel::KernelError;
use mesh_builder::MeshError;
use thiserror::Error;

/// Errors that can occur while evaluating a job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The kernel rejected an operation.
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// An operation needed more operands than the stack holds.
    #[error("Stack underflow in {operation}: needs {needed}, has {available}")]
    StackUnderflow {
        operation: &'static str,
        needed: usize,
        available: usize,
    },

    /// The tree did not reduce to exactly one solid.
    #[error("Tree left {0} solids on the stack, expected 1")]
    LeftoverStack(usize),

    /// A mesh leaf's buffers are inconsistent.
    #[error("Malformed mesh leaf: {0}")]
    MalformedLeaf(#[from] MeshError),

    /// An operation arrived before a kernel was loaded.
    #[error("Worker is not initialized")]
    Uninitialized,

    /// Evaluation panicked.
    #[error("Evaluation panicked: {0}")]
    Panicked(String),
}

impl EvalError {
    pub fn underflow(operation: &'static str, needed: usize, available: usize) -> Self {
        Self::StackUnderflow {
            operation,
            needed,
            available,
        }
    }
}

/// Result type alias for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

// =============================================================================
// TESTS
// =============================================================================
