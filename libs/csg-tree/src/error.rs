//! # Protocol Errors
//!
//! Errors raised while encoding, decoding or validating jobs.

use mesh_builder::MeshError;
use thiserror::Error;

/// Errors that can occur on the protocol boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// A message failed to decode; unknown tags land here.
    #[error("Malformed message: {message}")]
    Malformed { message: String },

    /// A message failed to encode.
    #[error("Encoding failed: {message}")]
    Encode { message: String },

    /// A mesh leaf has inconsistent buffers.
    #[error("Invalid mesh leaf #{leaf}: {source}")]
    InvalidLeaf { leaf: usize, source: MeshError },

    /// An operation node cannot be evaluated.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl ProtocolError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
