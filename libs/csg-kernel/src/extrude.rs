//! # Cross-Section Extrusion
//!
//! Solids swept from 2D contours:
//! - **extrude**: sweep along +Z with optional twist and top scale
//! - **revolve**: sweep around the Z axis, the contour's Y becoming Z
//!
//! Contours are simple polygons without holes. Clockwise contours are
//! reversed; caps are ear-clipped so concave contours work.

use std::f64::consts::TAU;

use config::constants::{DEFAULT_CIRCULAR_SEGMENTS, KERNEL_EPSILON, MIN_CIRCULAR_SEGMENTS};
use csg_tree::{CrossSection, Extrusion, Revolution};
use glam::{DVec2, DVec3};

use crate::error::{KernelError, KernelResult};
use crate::triangulate::{signed_area2, triangulate};

// =============================================================================
// CONTOURS
// =============================================================================

/// Counter-clockwise contours with repeated points removed; contours with
/// no area are dropped.
fn clean_contours(cross_section: &CrossSection) -> KernelResult<Vec<Vec<DVec2>>> {
    let contours: Vec<Vec<DVec2>> = cross_section
        .contours
        .iter()
        .filter_map(|contour| {
            let mut points: Vec<DVec2> = contour.iter().map(|&[x, y]| DVec2::new(x, y)).collect();
            points.dedup();
            while points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            let area2 = signed_area2(&points);
            if points.len() < 3 || area2.abs() <= KERNEL_EPSILON * KERNEL_EPSILON {
                return None;
            }
            if area2 < 0.0 {
                points.reverse();
            }
            Some(points)
        })
        .collect();

    if contours.is_empty() {
        return Err(KernelError::degenerate("no contour with positive area"));
    }
    Ok(contours)
}

// =============================================================================
// EXTRUDE
// =============================================================================

/// Faces of a linear extrusion.
///
/// ## Errors
///
/// Returns [`KernelError::InvalidParameter`] for a non-positive height or
/// negative top scale, [`KernelError::DegenerateCrossSection`] when no
/// contour has area.
pub fn extrude_faces(extrusion: &Extrusion) -> KernelResult<Vec<Vec<DVec3>>> {
    if extrusion.height <= 0.0 {
        return Err(KernelError::invalid_parameter(format!(
            "extrusion height must be positive: {}",
            extrusion.height
        )));
    }
    let scale_top = DVec2::from_array(extrusion.scale_top);
    if scale_top.min_element() < 0.0 {
        return Err(KernelError::invalid_parameter(format!(
            "extrusion top scale must be non-negative: {scale_top}"
        )));
    }
    let contours = clean_contours(&extrusion.cross_section)?;

    let slices = extrusion.n_divisions + 1;
    let z0 = if extrusion.center {
        -extrusion.height / 2.0
    } else {
        0.0
    };
    let twist = extrusion.twist_degrees.to_radians();

    let mut faces = Vec::new();
    for contour in &contours {
        let n = contour.len();
        let rings: Vec<Vec<DVec3>> = (0..=slices)
            .map(|s| {
                let t = f64::from(s) / f64::from(slices);
                let scale = DVec2::ONE.lerp(scale_top, t);
                let rotation = DVec2::from_angle(twist * t);
                let z = z0 + extrusion.height * t;
                contour
                    .iter()
                    .map(|&p| rotation.rotate(p * scale).extend(z))
                    .collect()
            })
            .collect();

        // Side walls, two triangles per quad; collapsed top rings leave
        // degenerate triangles that are dropped later.
        for pair in rings.windows(2) {
            let (base, next) = (&pair[0], &pair[1]);
            for i in 0..n {
                let j = (i + 1) % n;
                faces.push(vec![base[i], base[j], next[j]]);
                faces.push(vec![base[i], next[j], next[i]]);
            }
        }

        let cap = triangulate(contour);
        if let (Some(bottom), Some(top)) = (rings.first(), rings.last()) {
            for &[a, b, c] in &cap {
                faces.push(vec![bottom[a], bottom[c], bottom[b]]);
                faces.push(vec![top[a], top[b], top[c]]);
            }
        }
    }
    Ok(faces)
}

// =============================================================================
// REVOLVE
// =============================================================================

/// Faces of a revolution around +Z.
///
/// A full turn closes on itself; a partial turn adds start and end caps.
///
/// ## Errors
///
/// Returns [`KernelError::InvalidParameter`] for a non-positive angle or
/// contour points left of the axis, [`KernelError::DegenerateCrossSection`]
/// when no contour has area.
pub fn revolve_faces(revolution: &Revolution) -> KernelResult<Vec<Vec<DVec3>>> {
    let degrees = revolution.revolve_degrees;
    if degrees <= 0.0 {
        return Err(KernelError::invalid_parameter(format!(
            "revolve angle must be positive: {degrees}"
        )));
    }
    let contours = clean_contours(&revolution.cross_section)?;
    if let Some(p) = contours.iter().flatten().find(|p| p.x < -KERNEL_EPSILON) {
        return Err(KernelError::invalid_parameter(format!(
            "revolve profile point left of the axis: {p}"
        )));
    }

    let full = degrees >= 360.0;
    let base_segments = revolution
        .circular_segments
        .unwrap_or(DEFAULT_CIRCULAR_SEGMENTS)
        .max(MIN_CIRCULAR_SEGMENTS);
    let segments = if full {
        base_segments
    } else {
        ((f64::from(base_segments) * degrees / 360.0).round() as u32).max(1)
    };
    let sweep = if full { TAU } else { degrees.to_radians() };
    let steps = if full { segments } else { segments + 1 };

    let mut faces = Vec::new();
    for contour in &contours {
        let n = contour.len();
        let rings: Vec<Vec<DVec3>> = (0..steps)
            .map(|k| {
                let angle = sweep * f64::from(k) / f64::from(segments);
                let (sin, cos) = angle.sin_cos();
                contour
                    .iter()
                    .map(|p| {
                        let r = p.x.max(0.0);
                        DVec3::new(r * cos, r * sin, p.y)
                    })
                    .collect()
            })
            .collect();

        for k in 0..segments as usize {
            let current = &rings[k];
            let next = &rings[(k + 1) % rings.len()];
            for i in 0..n {
                let j = (i + 1) % n;
                faces.push(vec![current[i], next[i], next[j], current[j]]);
            }
        }

        if !full {
            let cap = triangulate(contour);
            if let (Some(start), Some(end)) = (rings.first(), rings.last()) {
                for &[a, b, c] in &cap {
                    faces.push(vec![start[a], start[b], start[c]]);
                    faces.push(vec![end[a], end[c], end[b]]);
                }
            }
        }
    }
    Ok(faces)
}

// =============================================================================
// TESTS
// =============================================================================
