//! # Polygon for BSP Operations
//!
//! Convex planar polygon carrying per-vertex properties and the original
//! ID of the mesh it came from.

use std::cmp::Ordering;

use glam::DVec3;

use super::plane::{Classification, Plane};

// =============================================================================
// VERTEX
// =============================================================================

/// Polygon corner: position plus interpolated properties.
#[derive(Debug, Clone, PartialEq)]
pub struct BspVertex {
    pub position: DVec3,
    pub props: Vec<f64>,
}

impl BspVertex {
    pub fn new(position: DVec3, props: Vec<f64>) -> Self {
        Self { position, props }
    }

    /// Vertex without properties.
    pub fn at(position: DVec3) -> Self {
        Self::new(position, Vec::new())
    }

    /// Linear interpolation of position and properties.
    pub fn lerp(&self, other: &BspVertex, t: f64) -> BspVertex {
        BspVertex {
            position: self.position.lerp(other.position, t),
            props: self
                .props
                .iter()
                .zip(&other.props)
                .map(|(a, b)| a + (b - a) * t)
                .collect(),
        }
    }
}

/// Total order on positions, used to make shared-edge computations
/// independent of traversal direction.
pub fn position_order(a: DVec3, b: DVec3) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Point at `k / n` along the edge `a -> b`, bit-identical to the point at
/// `(n - k) / n` along `b -> a`.
pub fn edge_point(a: &BspVertex, b: &BspVertex, k: u32, n: u32) -> BspVertex {
    if k == 0 {
        return a.clone();
    }
    if k == n {
        return b.clone();
    }
    if position_order(a.position, b.position) == Ordering::Greater {
        b.lerp(a, f64::from(n - k) / f64::from(n))
    } else {
        a.lerp(b, f64::from(k) / f64::from(n))
    }
}

// =============================================================================
// POLYGON
// =============================================================================

/// Convex planar polygon, counter-clockwise seen from the front.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<BspVertex>,
    plane: Plane,
    origin: u32,
    normal_offset: Option<usize>,
}

impl Polygon {
    /// Creates a polygon, dropping repeated consecutive positions.
    ///
    /// `normal_offset` indexes a normal stored in `props`, negated when the
    /// polygon flips. Returns `None` when fewer than three distinct
    /// corners remain or the polygon has no area.
    pub fn new(mut vertices: Vec<BspVertex>, origin: u32, normal_offset: Option<usize>) -> Option<Self> {
        vertices.dedup_by(|b, a| a.position == b.position);
        while vertices.len() > 1 && vertices.first().map(|v| v.position) == vertices.last().map(|v| v.position) {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(vertices.iter().map(|v| v.position))?;
        Some(Self {
            vertices,
            plane,
            origin,
            normal_offset,
        })
    }

    /// Piece of a split polygon: keeps the parent's plane so slivers are
    /// not lost to area tolerance.
    fn with_plane(mut vertices: Vec<BspVertex>, parent: &Polygon) -> Option<Self> {
        vertices.dedup_by(|b, a| a.position == b.position);
        while vertices.len() > 1 && vertices.first().map(|v| v.position) == vertices.last().map(|v| v.position) {
            vertices.pop();
        }
        (vertices.len() >= 3).then(|| Self {
            vertices,
            plane: parent.plane,
            origin: parent.origin,
            normal_offset: parent.normal_offset,
        })
    }

    pub fn vertices(&self) -> &[BspVertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [BspVertex] {
        &mut self.vertices
    }

    pub fn into_vertices(self) -> Vec<BspVertex> {
        self.vertices
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: u32) {
        self.origin = origin;
    }

    pub fn normal_offset(&self) -> Option<usize> {
        self.normal_offset
    }

    /// Pads every vertex's properties with zeros up to `len`.
    pub fn pad_props(&mut self, len: usize) {
        for vertex in &mut self.vertices {
            if vertex.props.len() < len {
                vertex.props.resize(len, 0.0);
            }
        }
    }

    /// Reverses orientation.
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flip();
        if let Some(offset) = self.normal_offset {
            for vertex in &mut self.vertices {
                if let Some(normal) = vertex.props.get_mut(offset..offset + 3) {
                    normal.iter_mut().for_each(|c| *c = -*c);
                }
            }
        }
    }

    pub fn classify(&self, plane: &Plane) -> Classification {
        let mut front_count = 0;
        let mut back_count = 0;

        for v in &self.vertices {
            match plane.classify_point(v.position) {
                Classification::Front => front_count += 1,
                Classification::Back => back_count += 1,
                _ => {}
            }
        }

        if front_count > 0 && back_count > 0 {
            Classification::Spanning
        } else if front_count > 0 {
            Classification::Front
        } else if back_count > 0 {
            Classification::Back
        } else {
            Classification::Coplanar
        }
    }

    /// Splits by `plane` into the matching output lists.
    ///
    /// Coplanar polygons go to `coplanar_front` or `coplanar_back`
    /// depending on whether they face the same way as the plane.
    pub fn split(
        self,
        plane: &Plane,
        coplanar_front: &mut Vec<Polygon>,
        coplanar_back: &mut Vec<Polygon>,
        front: &mut Vec<Polygon>,
        back: &mut Vec<Polygon>,
    ) {
        match self.classify(plane) {
            Classification::Coplanar => {
                if self.plane.normal().dot(plane.normal()) > 0.0 {
                    coplanar_front.push(self);
                } else {
                    coplanar_back.push(self);
                }
            }
            Classification::Front => front.push(self),
            Classification::Back => back.push(self),
            Classification::Spanning => {
                let mut front_verts = Vec::new();
                let mut back_verts = Vec::new();
                let n = self.vertices.len();

                for i in 0..n {
                    let vi = &self.vertices[i];
                    let vj = &self.vertices[(i + 1) % n];
                    let ti = plane.classify_point(vi.position);
                    let tj = plane.classify_point(vj.position);

                    if ti != Classification::Back {
                        front_verts.push(vi.clone());
                    }
                    if ti != Classification::Front {
                        back_verts.push(vi.clone());
                    }

                    if (ti == Classification::Front && tj == Classification::Back)
                        || (ti == Classification::Back && tj == Classification::Front)
                    {
                        let crossing = edge_crossing(plane, vi, vj);
                        front_verts.push(crossing.clone());
                        back_verts.push(crossing);
                    }
                }

                if let Some(poly) = Polygon::with_plane(front_verts, &self) {
                    front.push(poly);
                }
                if let Some(poly) = Polygon::with_plane(back_verts, &self) {
                    back.push(poly);
                }
            }
        }
    }
}

/// Intersection of edge `a - b` with `plane`, computed from the lesser
/// endpoint so both polygons sharing the edge get the same point.
fn edge_crossing(plane: &Plane, a: &BspVertex, b: &BspVertex) -> BspVertex {
    let (from, to) = if position_order(a.position, b.position) == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    };
    let d_from = plane.signed_distance(from.position);
    let d_to = plane.signed_distance(to.position);
    from.lerp(to, d_from / (d_from - d_to))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> Polygon {
        Polygon::new(
            vec![
                BspVertex::new(DVec3::new(-1.0, -1.0, z), vec![0.0]),
                BspVertex::new(DVec3::new(1.0, -1.0, z), vec![1.0]),
                BspVertex::new(DVec3::new(1.0, 1.0, z), vec![1.0]),
                BspVertex::new(DVec3::new(-1.0, 1.0, z), vec![0.0]),
            ],
            7,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_new_drops_repeated_corners() {
        let p = DVec3::new(1.0, 0.0, 0.0);
        let poly = Polygon::new(
            vec![
                BspVertex::at(DVec3::ZERO),
                BspVertex::at(p),
                BspVertex::at(p),
                BspVertex::at(DVec3::Y),
                BspVertex::at(DVec3::ZERO),
            ],
            0,
            None,
        )
        .unwrap();
        assert_eq!(poly.vertices().len(), 3);
    }

    #[test]
    fn test_split_spanning_interpolates_props() {
        let plane = Plane::new(DVec3::X, 0.0);
        let (mut cf, mut cb, mut front, mut back) = (vec![], vec![], vec![], vec![]);
        square(0.0).split(&plane, &mut cf, &mut cb, &mut front, &mut back);

        assert_eq!(front.len(), 1);
        assert_eq!(back.len(), 1);
        assert_eq!(front[0].origin(), 7);
        let mid: Vec<_> = front[0]
            .vertices()
            .iter()
            .filter(|v| v.position.x.abs() < 1e-12)
            .collect();
        assert_eq!(mid.len(), 2);
        assert!(mid.iter().all(|v| (v.props[0] - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_split_coplanar_by_facing() {
        let plane = Plane::new(DVec3::Z, 0.0);
        let (mut cf, mut cb, mut front, mut back) = (vec![], vec![], vec![], vec![]);
        square(0.0).split(&plane, &mut cf, &mut cb, &mut front, &mut back);
        let mut flipped = square(0.0);
        flipped.flip();
        flipped.split(&plane, &mut cf, &mut cb, &mut front, &mut back);
        assert_eq!((cf.len(), cb.len()), (1, 1));
    }

    #[test]
    fn test_edge_crossing_is_direction_independent() {
        let plane = Plane::new(DVec3::new(1.0, 0.3, 0.0).normalize(), 0.1234);
        let a = BspVertex::at(DVec3::new(-0.7, 0.1, 0.3));
        let b = BspVertex::at(DVec3::new(0.9, -0.2, 0.5));
        assert_eq!(edge_crossing(&plane, &a, &b), edge_crossing(&plane, &b, &a));
    }

    #[test]
    fn test_flip_negates_normal_channel() {
        let mut poly = Polygon::new(
            vec![
                BspVertex::new(DVec3::ZERO, vec![9.0, 0.0, 0.0, 1.0]),
                BspVertex::new(DVec3::X, vec![9.0, 0.0, 0.0, 1.0]),
                BspVertex::new(DVec3::Y, vec![9.0, 0.0, 0.0, 1.0]),
            ],
            0,
            Some(1),
        )
        .unwrap();
        poly.flip();
        assert_eq!(poly.vertices()[0].props, vec![9.0, 0.0, 0.0, -1.0]);
        assert!(poly.plane().normal().z < 0.0);
    }
}
