//! # Plane for BSP Operations
//!
//! Plane representation with point classification.

use config::constants::KERNEL_EPSILON;
use glam::DVec3;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classification of a point or polygon relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Positive side.
    Front,
    /// Negative side.
    Back,
    /// Within tolerance of the plane.
    Coplanar,
    /// Polygon with vertices on both sides.
    Spanning,
}

// =============================================================================
// PLANE
// =============================================================================

/// Oriented plane `normal . p = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: DVec3,
    w: f64,
}

impl Plane {
    pub fn new(normal: DVec3, w: f64) -> Self {
        Self { normal, w }
    }

    /// Plane through a polygon, using Newell's method so collinear leading
    /// vertices do not matter.
    ///
    /// Returns `None` when the polygon has no area.
    pub fn from_points(points: impl Iterator<Item = DVec3> + Clone) -> Option<Self> {
        let mut normal = DVec3::ZERO;
        let mut centroid = DVec3::ZERO;
        let mut count = 0usize;
        let mut next = points.clone().cycle().skip(1);
        for current in points {
            let following = next.next()?;
            normal.x += (current.y - following.y) * (current.z + following.z);
            normal.y += (current.z - following.z) * (current.x + following.x);
            normal.z += (current.x - following.x) * (current.y + following.y);
            centroid += current;
            count += 1;
        }
        // Newell's sum is twice the area vector.
        if count < 3 || normal.length() < KERNEL_EPSILON * KERNEL_EPSILON {
            return None;
        }
        let normal = normal.normalize();
        let w = normal.dot(centroid / count as f64);
        Some(Self { normal, w })
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn flip(&self) -> Plane {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    pub fn classify_point(&self, point: DVec3) -> Classification {
        let dist = self.signed_distance(point);
        if dist > KERNEL_EPSILON {
            Classification::Front
        } else if dist < -KERNEL_EPSILON {
            Classification::Back
        } else {
            Classification::Coplanar
        }
    }

    /// Positive in front, negative behind.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.w
    }
}

// =============================================================================
// TESTS
// =============================================================================
