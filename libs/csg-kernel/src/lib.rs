//! # CSG Kernel
//!
//! The geometry kernel seam used by CSG workers, plus a built-in kernel.
//!
//! A kernel owns solids and hands out [`SolidId`] handles. Meshes enter and
//! leave through [`MeshGl`], whose triangle runs carry the original ID of
//! the input each triangle came from, so callers can trace results back
//! to their sources.
//!
//! ## Example
//!
//! ```rust
//! use csg_kernel::{BuiltinKernelFactory, GeometryKernel, KernelFactory};
//! use csg_tree::BooleanOp;
//! use glam::DVec3;
//!
//! let mut kernel = BuiltinKernelFactory.create("builtin:bsp").unwrap();
//! let a = kernel.cube(DVec3::ONE, false).unwrap();
//! let b = kernel.cube(DVec3::ONE, true).unwrap();
//! let c = kernel.boolean(BooleanOp::Subtract, a, b).unwrap();
//! let volume = kernel.measure(c).unwrap().volume;
//! assert!((volume - 0.875).abs() < 1e-9);
//! ```

pub mod bsp;
mod bsp_kernel;
pub mod error;
mod extrude;
pub mod kernel;
pub mod mesh_gl;
mod primitives;
mod solid;
pub mod triangulate;

pub use bsp_kernel::BspKernel;
pub use error::{KernelError, KernelResult};
pub use kernel::{BuiltinKernelFactory, CylinderParams, GeometryKernel, KernelFactory, Measurements, SolidId};
pub use mesh_gl::{affine_from_columns, affine_to_columns, MeshGl, RUN_TRANSFORM_STRIDE};
