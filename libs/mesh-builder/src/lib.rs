//! # Mesh Builder
//!
//! Connected-triangle mesh construction for procedural geometry.
//!
//! Triangles carry interleaved vertex records (position, normal, UV,
//! tangent) and symmetric edge links. The [`MeshBuilder`] stitches,
//! subdivides, smooths and finally groups them into per-material submeshes
//! in the [`EncodedMeshGroup`] wire format consumed by the CSG pool.
//!
//! ## Example
//!
//! ```rust
//! use mesh_builder::{FinalizeHints, MeshBuilder, QuadCorners};
//! use glam::Vec3;
//! use std::collections::BTreeMap;
//!
//! let mut builder = MeshBuilder::new();
//! builder.add_subdiv_quad(
//!     &QuadCorners::new([Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y]),
//!     2,
//!     None,
//! );
//! builder.sub_divide4();
//! assert_eq!(builder.triangle_count(), 32);
//!
//! let finalized = builder
//!     .finalize::<()>(&BTreeMap::new(), FinalizeHints::default(), true)
//!     .unwrap();
//! assert_eq!(finalized.submeshes.len(), 1);
//! ```

pub mod bit_array;
pub mod builder;
mod decode;
pub mod dynamic_array;
pub mod encoded;
pub mod error;
pub mod triangle;
pub mod vertex_hasher;

pub use bit_array::BitArray;
pub use builder::{
    FinalizeHints, FinalizedMesh, FinalizedSubmesh, ManifoldBuffers, MeshBuilder, QuadCorners,
    SubdivQuad,
};
pub use dynamic_array::DynamicArray;
pub use encoded::{AttributeKind, EncodedMeshGroup, EncodedSubmesh, IndexBuffer, MergeMap};
pub use error::{MeshError, MeshResult};
pub use triangle::{EdgeLink, Triangle, TriangleId, Vertex};
pub use vertex_hasher::VertexHasher;
