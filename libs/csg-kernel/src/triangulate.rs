//! # Ear Clipping
//!
//! Triangulation of simple polygons, used for extrusion caps and for
//! exporting BSP polygons that carry collinear vertices.

use glam::{DVec2, DVec3};

/// Twice the signed area of a 2D polygon; positive when counter-clockwise.
pub fn signed_area2(points: &[DVec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.perp_dot(b)
        })
        .sum()
}

/// Triangulates a simple counter-clockwise polygon.
///
/// Returns index triples into `points`, each counter-clockwise. Collinear
/// vertices are kept as corners of neighboring triangles so shared edges
/// stay conforming. A polygon with no area yields no triangles.
pub fn triangulate(points: &[DVec2]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return if cross(points[0], points[1], points[2]) > 0.0 {
            vec![[0, 1, 2]]
        } else {
            Vec::new()
        };
    }

    let scale = points
        .iter()
        .fold(0.0_f64, |acc, p| acc.max(p.x.abs()).max(p.y.abs()))
        .max(1.0);
    let area_eps = 1e-12 * scale * scale;

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let curr = remaining[i];
            let next = remaining[(i + 1) % m];
            is_ear(points, &remaining, prev, curr, next, area_eps)
        });

        match ear {
            Some(i) => {
                let prev = remaining[(i + m - 1) % m];
                let next = remaining[(i + 1) % m];
                triangles.push([prev, remaining[i], next]);
                remaining.remove(i);
            }
            None => {
                // Only flat or self-touching corners remain: drop the flattest.
                let flattest = (0..m)
                    .min_by(|&a, &b| {
                        let ca = corner_cross(points, &remaining, a).abs();
                        let cb = corner_cross(points, &remaining, b).abs();
                        ca.total_cmp(&cb)
                    })
                    .unwrap_or(0);
                if corner_cross(points, &remaining, flattest) > area_eps {
                    let prev = remaining[(flattest + m - 1) % m];
                    let next = remaining[(flattest + 1) % m];
                    triangles.push([prev, remaining[flattest], next]);
                }
                remaining.remove(flattest);
            }
        }
    }

    if cross(points[remaining[0]], points[remaining[1]], points[remaining[2]]) > area_eps {
        triangles.push([remaining[0], remaining[1], remaining[2]]);
    }
    triangles
}

/// Projects 3D polygon vertices onto the plane with normal `normal`,
/// keeping counter-clockwise order when viewed from the front.
pub fn project(points: &[DVec3], normal: DVec3) -> Vec<DVec2> {
    let abs = normal.abs();
    let project_one: fn(DVec3) -> DVec2 = if abs.z >= abs.x && abs.z >= abs.y {
        if normal.z >= 0.0 {
            |p| DVec2::new(p.x, p.y)
        } else {
            |p| DVec2::new(p.y, p.x)
        }
    } else if abs.x >= abs.y {
        if normal.x >= 0.0 {
            |p| DVec2::new(p.y, p.z)
        } else {
            |p| DVec2::new(p.z, p.y)
        }
    } else if normal.y >= 0.0 {
        |p| DVec2::new(p.z, p.x)
    } else {
        |p| DVec2::new(p.x, p.z)
    };
    points.iter().map(|&p| project_one(p)).collect()
}

fn cross(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (b - a).perp_dot(c - a)
}

fn corner_cross(points: &[DVec2], remaining: &[usize], i: usize) -> f64 {
    let m = remaining.len();
    cross(
        points[remaining[(i + m - 1) % m]],
        points[remaining[i]],
        points[remaining[(i + 1) % m]],
    )
}

fn is_ear(
    points: &[DVec2],
    remaining: &[usize],
    prev: usize,
    curr: usize,
    next: usize,
    area_eps: f64,
) -> bool {
    let (a, b, c) = (points[prev], points[curr], points[next]);
    if cross(a, b, c) <= area_eps {
        return false;
    }
    remaining.iter().all(|&other| {
        if other == prev || other == curr || other == next {
            return true;
        }
        let p = points[other];
        if p == a || p == b || p == c {
            return true;
        }
        !inside_or_on(a, b, c, p, area_eps)
    })
}

fn inside_or_on(a: DVec2, b: DVec2, c: DVec2, p: DVec2, area_eps: f64) -> bool {
    cross(a, b, p) >= -area_eps && cross(b, c, p) >= -area_eps && cross(c, a, p) >= -area_eps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_area(points: &[DVec2], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| cross(points[t[0]], points[t[1]], points[t[2]]) / 2.0)
            .sum()
    }

    #[test]
    fn test_square() {
        let pts = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        let tris = triangulate(&pts);
        assert_eq!(tris.len(), 2);
        assert!((total_area(&pts, &tris) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_l_shape() {
        let pts = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(0.0, 2.0),
        ];
        let tris = triangulate(&pts);
        assert_eq!(tris.len(), 4);
        assert!((total_area(&pts, &tris) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_vertex_is_used() {
        let pts = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.5, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        let tris = triangulate(&pts);
        assert_eq!(tris.len(), 3);
        assert!(tris.iter().any(|t| t.contains(&1)));
        assert!((total_area(&pts, &tris) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_polygon_yields_nothing() {
        let pts = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(2.0, 0.0),
        ];
        assert!(triangulate(&pts).is_empty());
    }

    #[test]
    fn test_project_keeps_orientation() {
        let pts = [DVec3::ZERO, DVec3::Z, DVec3::Y];
        let normal = (DVec3::Z - DVec3::ZERO).cross(DVec3::Y - DVec3::ZERO);
        let flat = project(&pts, normal);
        assert!(signed_area2(&flat) > 0.0);
    }
}
