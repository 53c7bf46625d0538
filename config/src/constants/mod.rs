//! Centralized configuration values shared across the pipeline.
//!
//! ## Categories
//!
//! - **Precision**: position matching and kernel plane tolerances
//! - **Vertex layout**: interleaved per-vertex record used by the builder
//! - **Tessellation**: default segment counts for round primitives
//! - **Worker pool**: worker counts and the built-in kernel identifier

use std::fmt;

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Tolerance used when deciding whether two triangle corners share a position.
///
/// Edge stitching compares positions component-wise against this value.
///
/// # Examples
/// ```
/// use config::constants::POSITION_EPSILON;
/// assert!(POSITION_EPSILON < 1.0e-3);
/// ```
pub const POSITION_EPSILON: f32 = 1.0e-5;

/// Plane classification tolerance used by the built-in BSP kernel.
///
/// # Examples
/// ```
/// use config::constants::KERNEL_EPSILON;
/// assert!(KERNEL_EPSILON > 0.0);
/// ```
pub const KERNEL_EPSILON: f64 = 1.0e-5;

/// Lengths below this are treated as zero when normalizing vectors.
pub const NORMALIZE_EPSILON: f32 = 1.0e-12;

// =============================================================================
// VERTEX LAYOUT
// =============================================================================

/// Number of floats stored per vertex: position(3) normal(3) uv(2) tangent(4).
///
/// # Examples
/// ```
/// use config::constants::{VERTEX_STRIDE, TANGENT_OFFSET};
/// assert_eq!(TANGENT_OFFSET + 4, VERTEX_STRIDE);
/// ```
pub const VERTEX_STRIDE: usize = 12;

/// Offset of the position inside a vertex record.
pub const POSITION_OFFSET: usize = 0;

/// Offset of the normal inside a vertex record.
pub const NORMAL_OFFSET: usize = 3;

/// Offset of the texture coordinate inside a vertex record.
pub const UV_OFFSET: usize = 6;

/// Offset of the tangent (xyz + handedness w) inside a vertex record.
pub const TANGENT_OFFSET: usize = 8;

// =============================================================================
// TESSELLATION
// =============================================================================

/// Segment count used by round primitives when the caller passes none.
///
/// # Examples
/// ```
/// use config::constants::{DEFAULT_CIRCULAR_SEGMENTS, MIN_CIRCULAR_SEGMENTS};
/// assert!(DEFAULT_CIRCULAR_SEGMENTS >= MIN_CIRCULAR_SEGMENTS);
/// ```
pub const DEFAULT_CIRCULAR_SEGMENTS: u32 = 32;

/// Smallest segment count that still produces a closed solid.
pub const MIN_CIRCULAR_SEGMENTS: u32 = 3;

/// Default crease angle (radians) for angle-based normal smoothing.
pub const DEFAULT_SMOOTHING_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

// =============================================================================
// WORKER POOL
// =============================================================================

/// Number of workers a pool spawns when none is configured.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Upper bound on workers a single pool may own.
pub const MAX_WORKER_COUNT: usize = 64;

/// Library path understood by the built-in geometry kernel.
///
/// # Examples
/// ```
/// use config::constants::BUILTIN_KERNEL_PATH;
/// assert!(!BUILTIN_KERNEL_PATH.is_empty());
/// ```
pub const BUILTIN_KERNEL_PATH: &str = "builtin:bsp";

// =============================================================================
// VALIDATED CONFIGS
// =============================================================================

/// Settings for a CSG worker pool.
///
/// # Examples
/// ```
/// use config::constants::PoolConfig;
/// let cfg = PoolConfig::new(4, "builtin:bsp").expect("valid config");
/// assert_eq!(cfg.worker_count, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads to spawn on initialization.
    pub worker_count: usize,
    /// Kernel location handed to every worker in its `Initialize` request.
    pub library_path: String,
}

impl PoolConfig {
    /// Builds a pool configuration, rejecting empty pools and empty paths.
    pub fn new(worker_count: usize, library_path: impl Into<String>) -> Result<Self, ConfigError> {
        if worker_count == 0 || worker_count > MAX_WORKER_COUNT {
            return Err(ConfigError::InvalidWorkerCount(worker_count));
        }
        let library_path = library_path.into();
        if library_path.trim().is_empty() {
            return Err(ConfigError::EmptyLibraryPath);
        }
        Ok(Self {
            worker_count,
            library_path,
        })
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            library_path: BUILTIN_KERNEL_PATH.to_string(),
        }
    }
}

/// Settings for the connected-triangle mesh builder.
///
/// # Examples
/// ```
/// use config::constants::BuilderConfig;
/// let cfg = BuilderConfig::default();
/// assert!(cfg.position_epsilon > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuilderConfig {
    /// Tolerance for edge stitching.
    pub position_epsilon: f32,
}

impl BuilderConfig {
    /// Builds a builder configuration with a checked tolerance.
    pub fn new(position_epsilon: f32) -> Result<Self, ConfigError> {
        if position_epsilon <= 0.0 || !position_epsilon.is_finite() {
            return Err(ConfigError::InvalidTolerance(f64::from(position_epsilon)));
        }
        Ok(Self { position_epsilon })
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            position_epsilon: POSITION_EPSILON,
        }
    }
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Raised when a tolerance is zero, negative or not finite.
    InvalidTolerance(f64),
    /// Raised when the worker count is zero or above [`MAX_WORKER_COUNT`].
    InvalidWorkerCount(usize),
    /// Raised when the kernel library path is blank.
    EmptyLibraryPath,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTolerance(value) => {
                write!(f, "tolerance must be positive and finite: {value}")
            }
            ConfigError::InvalidWorkerCount(value) => {
                write!(f, "worker_count must be in 1..={MAX_WORKER_COUNT}: {value}")
            }
            ConfigError::EmptyLibraryPath => write!(f, "library_path must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests;
