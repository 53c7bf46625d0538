//! # Mesh Errors
//!
//! Error types for mesh building and encoding.
//!
//! Topology errors are fatal: generation is deterministic, so retrying the
//! same builder calls would fail the same way.

use crate::triangle::TriangleId;
use thiserror::Error;

/// Errors that can occur while building or finalizing a mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// A targeted stitch found no matching edge.
    #[error("Unconnected edge: triangle {triangle} edge {edge} has no matching edge")]
    UnconnectedEdge { triangle: TriangleId, edge: u8 },

    /// Not every triangle is reachable from triangle 0.
    #[error("Mesh is not connected: reached {reached} of {total} triangles")]
    Disconnected { reached: usize, total: usize },

    /// A triangle handle does not belong to this builder.
    #[error("Invalid triangle: {0}")]
    InvalidTriangle(TriangleId),

    /// Edge or vertex indices must be 0, 1 or 2.
    #[error("Invalid corner index: {0}")]
    InvalidCorner(u8),

    /// Encoded buffers are inconsistent.
    #[error("Invalid encoding: {message}")]
    InvalidEncoding { message: String },

    /// Too many vertices for a 32-bit index buffer.
    #[error("Too many vertices: {count} (max: {max})")]
    TooManyVertices { count: usize, max: usize },
}

impl MeshError {
    /// Creates an invalid encoding error.
    pub fn invalid_encoding(message: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            message: message.into(),
        }
    }
}

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
