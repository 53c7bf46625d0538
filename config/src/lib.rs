//! # Config Crate
//!
//! Centralized configuration constants for the procedural mesh and CSG
//! pipeline. Tolerances, vertex layout offsets and worker-pool defaults are
//! defined here so the builder, the kernel and the pool agree on them.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{POSITION_EPSILON, VERTEX_STRIDE, NORMAL_OFFSET};
//!
//! let a = 1.0_f32;
//! let b = a + POSITION_EPSILON / 2.0;
//! assert!((a - b).abs() <= POSITION_EPSILON);
//! assert_eq!(VERTEX_STRIDE, 12);
//! assert_eq!(NORMAL_OFFSET, 3);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Validated Configs**: Runtime-tunable values go through checked constructors

pub mod constants;

#[cfg(test)]
mod tests;
