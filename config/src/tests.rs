//! # Tests for Config Constants
//!
//! Sanity checks on the shared constants.

use crate::constants::*;

// =============================================================================
// PRECISION TESTS
// =============================================================================

#[test]
fn test_position_epsilon_is_small_and_positive() {
    assert!(POSITION_EPSILON > 0.0);
    assert!(POSITION_EPSILON < 1.0e-3);
}

#[test]
fn test_kernel_epsilon_is_positive() {
    assert!(KERNEL_EPSILON > 0.0);
}

// =============================================================================
// LAYOUT TESTS
// =============================================================================

#[test]
fn test_vertex_layout_is_contiguous() {
    assert_eq!(POSITION_OFFSET, 0);
    assert_eq!(NORMAL_OFFSET, POSITION_OFFSET + 3);
    assert_eq!(UV_OFFSET, NORMAL_OFFSET + 3);
    assert_eq!(TANGENT_OFFSET, UV_OFFSET + 2);
    assert_eq!(VERTEX_STRIDE, TANGENT_OFFSET + 4);
}

// =============================================================================
// POOL TESTS
// =============================================================================

#[test]
fn test_default_worker_count_within_bounds() {
    assert!(DEFAULT_WORKER_COUNT >= 1);
    assert!(DEFAULT_WORKER_COUNT <= MAX_WORKER_COUNT);
}

#[test]
fn test_min_segments_forms_polygon() {
    assert!(MIN_CIRCULAR_SEGMENTS >= 3);
}
