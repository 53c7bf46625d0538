//! # Kernel Errors
//!
//! Error types for geometry kernel operations.

use thiserror::Error;

use crate::kernel::SolidId;

/// Errors raised by a [`GeometryKernel`](crate::GeometryKernel).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// Handle was never issued or has already been freed.
    #[error("Invalid solid handle: {0}")]
    InvalidHandle(SolidId),

    /// Interchange mesh is malformed.
    #[error("Invalid mesh: {message}")]
    InvalidMesh { message: String },

    /// Primitive or operation parameter out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Cross-section has no usable contour.
    #[error("Degenerate cross-section: {message}")]
    DegenerateCrossSection { message: String },

    /// Kernel library path not recognized by the factory.
    #[error("Unsupported kernel library: {path}")]
    UnsupportedLibrary { path: String },
}

impl KernelError {
    /// Creates an invalid mesh error.
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a degenerate cross-section error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateCrossSection {
            message: message.into(),
        }
    }
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
