//! # Primitive Shapes
//!
//! Faces of the built-in solids, each a planar convex polygon wound
//! counter-clockwise seen from outside.

use std::f64::consts::{PI, TAU};

use config::constants::MIN_CIRCULAR_SEGMENTS;
use glam::DVec3;

use crate::error::{KernelError, KernelResult};
use crate::kernel::CylinderParams;

/// Box with the minimum corner at the origin, or centered.
pub fn cube_faces(size: DVec3, center: bool) -> Vec<Vec<DVec3>> {
    let offset = if center { -size / 2.0 } else { DVec3::ZERO };
    let corner = |x: f64, y: f64, z: f64| offset + size * DVec3::new(x, y, z);

    let quads: [[(f64, f64, f64); 4]; 6] = [
        [(0.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 1.0, 0.0), (1.0, 0.0, 0.0)],
        [(0.0, 0.0, 1.0), (1.0, 0.0, 1.0), (1.0, 1.0, 1.0), (0.0, 1.0, 1.0)],
        [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (1.0, 0.0, 1.0), (0.0, 0.0, 1.0)],
        [(0.0, 1.0, 0.0), (0.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, 0.0)],
        [(0.0, 0.0, 0.0), (0.0, 0.0, 1.0), (0.0, 1.0, 1.0), (0.0, 1.0, 0.0)],
        [(1.0, 0.0, 0.0), (1.0, 1.0, 0.0), (1.0, 1.0, 1.0), (1.0, 0.0, 1.0)],
    ];
    quads
        .iter()
        .map(|quad| quad.iter().map(|&(x, y, z)| corner(x, y, z)).collect())
        .collect()
}

/// Cylinder or cone along +Z.
///
/// ## Errors
///
/// Returns [`KernelError::InvalidParameter`] for a non-positive height,
/// negative radii, both radii zero, or too few segments.
pub fn cylinder_faces(params: CylinderParams) -> KernelResult<Vec<Vec<DVec3>>> {
    let CylinderParams {
        height,
        radius_low,
        radius_high,
        segments,
        center,
    } = params;

    if height <= 0.0 {
        return Err(KernelError::invalid_parameter(format!(
            "cylinder height must be positive: {height}"
        )));
    }
    if radius_low < 0.0 || radius_high < 0.0 || (radius_low == 0.0 && radius_high == 0.0) {
        return Err(KernelError::invalid_parameter(format!(
            "cylinder radii must be non-negative and not both zero: {radius_low}, {radius_high}"
        )));
    }
    check_segments(segments)?;

    let (z0, z1) = if center {
        (-height / 2.0, height / 2.0)
    } else {
        (0.0, height)
    };
    let ring = |radius: f64, z: f64| -> Vec<DVec3> {
        (0..segments)
            .map(|j| {
                let theta = TAU * f64::from(j) / f64::from(segments);
                DVec3::new(radius * theta.cos(), radius * theta.sin(), z)
            })
            .collect()
    };
    let bottom = ring(radius_low, z0);
    let top = ring(radius_high, z1);

    let n = segments as usize;
    let mut faces = Vec::with_capacity(n + 2);
    // Degenerate caps of a cone are dropped when polygons are built.
    faces.push(bottom.iter().rev().copied().collect());
    faces.push(top.clone());
    for j in 0..n {
        let k = (j + 1) % n;
        faces.push(vec![bottom[j], bottom[k], top[k], top[j]]);
    }
    Ok(faces)
}

/// Sphere of latitude rings with polygon caps instead of pole vertices.
///
/// ## Errors
///
/// Returns [`KernelError::InvalidParameter`] for a non-positive radius or
/// too few segments.
pub fn sphere_faces(radius: f64, segments: u32) -> KernelResult<Vec<Vec<DVec3>>> {
    if radius <= 0.0 {
        return Err(KernelError::invalid_parameter(format!(
            "sphere radius must be positive: {radius}"
        )));
    }
    check_segments(segments)?;

    let num_rings = (segments + 1) / 2;
    let rings: Vec<Vec<DVec3>> = (0..num_rings)
        .map(|i| {
            let phi = PI * (f64::from(i) + 0.5) / f64::from(num_rings);
            let ring_radius = radius * phi.sin();
            let z = radius * phi.cos();
            (0..segments)
                .map(|j| {
                    let theta = TAU * f64::from(j) / f64::from(segments);
                    DVec3::new(ring_radius * theta.cos(), ring_radius * theta.sin(), z)
                })
                .collect()
        })
        .collect();

    let n = segments as usize;
    let mut faces = Vec::new();
    if let (Some(first), Some(last)) = (rings.first(), rings.last()) {
        faces.push(first.clone());
        faces.push(last.iter().rev().copied().collect());
    }
    for pair in rings.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        for j in 0..n {
            let k = (j + 1) % n;
            faces.push(vec![upper[j], lower[j], lower[k], upper[k]]);
        }
    }
    Ok(faces)
}

/// Regular tetrahedron inscribed in `[-1, 1]^3`.
pub fn tetrahedron_faces() -> Vec<Vec<DVec3>> {
    let v = [
        DVec3::new(-1.0, -1.0, 1.0),
        DVec3::new(-1.0, 1.0, -1.0),
        DVec3::new(1.0, -1.0, -1.0),
        DVec3::new(1.0, 1.0, 1.0),
    ];
    [[2, 0, 1], [0, 3, 1], [2, 3, 0], [3, 2, 1]]
        .iter()
        .map(|tri| tri.iter().map(|&i| v[i]).collect())
        .collect()
}

fn check_segments(segments: u32) -> KernelResult<()> {
    if segments < MIN_CIRCULAR_SEGMENTS {
        return Err(KernelError::invalid_parameter(format!(
            "at least {MIN_CIRCULAR_SEGMENTS} segments required, got {segments}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::Solid;
    use approx::assert_relative_eq;

    #[test]
    fn test_centered_cube_bounds() {
        let m = Solid::from_faces(cube_faces(DVec3::new(2.0, 4.0, 6.0), true), 0).measure();
        assert_eq!(m.bounds, Some((DVec3::new(-1.0, -2.0, -3.0), DVec3::new(1.0, 2.0, 3.0))));
        assert_relative_eq!(m.volume, 48.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cylinder_volume_approaches_exact() {
        let params = CylinderParams {
            height: 2.0,
            radius_low: 1.0,
            radius_high: 1.0,
            segments: 64,
            center: false,
        };
        let m = Solid::from_faces(cylinder_faces(params).unwrap(), 0).measure();
        // Inscribed polygon area: n/2 sin(2pi/n)
        let expected = 2.0 * 32.0 * (TAU / 64.0).sin();
        assert_relative_eq!(m.volume, expected, epsilon = 1e-9);
        assert_eq!(m.genus, 0);
    }

    #[test]
    fn test_cone_has_no_top_cap() {
        let params = CylinderParams {
            height: 1.0,
            radius_low: 1.0,
            radius_high: 0.0,
            segments: 8,
            center: true,
        };
        let solid = Solid::from_faces(cylinder_faces(params).unwrap(), 0);
        assert_eq!(solid.polygons().len(), 9);
        assert_eq!(solid.measure().genus, 0);
    }

    #[test]
    fn test_cylinder_rejects_zero_radii() {
        let params = CylinderParams {
            height: 1.0,
            radius_low: 0.0,
            radius_high: 0.0,
            segments: 8,
            center: false,
        };
        assert!(cylinder_faces(params).is_err());
    }

    #[test]
    fn test_sphere_is_closed_and_positive() {
        let m = Solid::from_faces(sphere_faces(1.0, 16).unwrap(), 0).measure();
        assert_eq!(m.genus, 0);
        assert!(m.volume > 3.5 && m.volume < 4.0 * PI / 3.0);
    }

    #[test]
    fn test_sphere_rejects_bad_segments() {
        assert!(sphere_faces(1.0, 2).is_err());
        assert!(sphere_faces(0.0, 16).is_err());
    }

    #[test]
    fn test_tetrahedron_volume() {
        let m = Solid::from_faces(tetrahedron_faces(), 0).measure();
        assert_relative_eq!(m.volume, 8.0 / 3.0, epsilon = 1e-12);
        assert_eq!((m.num_vert, m.num_edge, m.num_tri), (4, 6, 4));
    }
}
