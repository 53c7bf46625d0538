//! Midpoint subdivision.

use super::MeshBuilder;
use crate::triangle::{EdgeLink, Triangle, TriangleId, Vertex};

/// Children of triangle `[a, b, c]` with midpoints `m01`, `m12`, `m20`:
/// `[a, m01, m20]`, `[m01, b, m12]`, `[m20, m12, c]`, `[m01, m12, m20]`.
///
/// Internal links as `(child, edge, child, edge)`.
const INTERNAL_LINKS: [(usize, u8, usize, u8); 3] = [(0, 1, 3, 2), (1, 2, 3, 0), (2, 0, 3, 1)];

#[inline]
fn child(parent: TriangleId, index: usize) -> TriangleId {
    TriangleId(parent.0 * 4 + index as u32)
}

impl MeshBuilder {
    /// Splits every triangle into four at its edge midpoints.
    ///
    /// Triangle `k` is replaced by triangles `4k..4k + 4`. Midpoint
    /// attributes are endpoint averages with normal and tangent
    /// renormalized. Connectivity is carried over: the first half of parent
    /// edge `i` belongs to child `i` and the second half to child
    /// `(i + 1) % 3`, both on edge `i`.
    pub fn sub_divide4(&mut self) {
        let parents = std::mem::take(&mut self.triangles);
        let mut children = Vec::with_capacity(parents.len() * 4);

        for (index, parent) in parents.iter().enumerate() {
            let id = TriangleId(index as u32);
            let [a, b, c] = [parent.vertex(0), parent.vertex(1), parent.vertex(2)];
            let m01 = Vertex::midpoint(&a, &b);
            let m12 = Vertex::midpoint(&b, &c);
            let m20 = Vertex::midpoint(&c, &a);

            let mut quartet = [
                Triangle::new([a, m01, m20]),
                Triangle::new([m01, b, m12]),
                Triangle::new([m20, m12, c]),
                Triangle::new([m01, m12, m20]),
            ];
            for triangle in &mut quartet {
                triangle.set_material(parent.material());
            }

            for &(x, ex, y, ey) in &INTERNAL_LINKS {
                quartet[x].set_link(ex, Some(EdgeLink::new(child(id, y), ey)));
                quartet[y].set_link(ey, Some(EdgeLink::new(child(id, x), ex)));
            }

            for edge in 0..3u8 {
                let Some(link) = parent.link(edge) else {
                    continue;
                };
                let i = edge as usize;
                let j = link.edge as usize;
                let first_half = EdgeLink::new(child(link.triangle, (j + 1) % 3), link.edge);
                let second_half = EdgeLink::new(child(link.triangle, j), link.edge);
                quartet[i].set_link(edge, Some(first_half));
                quartet[(i + 1) % 3].set_link(edge, Some(second_half));
            }

            children.extend(quartet);
        }

        log::debug!(
            "Subdivided {} triangles into {}",
            parents.len(),
            children.len()
        );
        self.triangles = children;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::QuadCorners;
    use glam::Vec3;

    fn assert_links_symmetric(builder: &MeshBuilder) {
        for id in builder.ids() {
            let triangle = builder.triangle(id).unwrap();
            for edge in 0..3 {
                if let Some(link) = triangle.link(edge) {
                    let other = builder.triangle(link.triangle).unwrap();
                    assert_eq!(other.link(link.edge), Some(EdgeLink::new(id, edge)));
                    let shared = other.position((link.edge as usize + 1) % 3);
                    assert_eq!(triangle.position(edge as usize), shared);
                }
            }
        }
    }

    #[test]
    fn test_quad_subdivision() {
        let mut builder = MeshBuilder::new();
        builder.add_subdiv_quad(
            &QuadCorners::new([
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(2.0, 2.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ]),
            1,
            Some(1),
        );
        builder.sub_divide4();

        assert_eq!(builder.triangle_count(), 8);
        assert!(builder.is_connected());
        assert_links_symmetric(&builder);
        for triangle in builder.triangles() {
            assert_eq!(triangle.material(), Some(1));
            for i in 0..3 {
                assert_eq!(triangle.normal(i), Vec3::Z);
            }
        }
    }

    #[test]
    fn test_subdivision_keeps_open_edges_open() {
        let mut builder = MeshBuilder::new();
        builder.add_triangle(Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]));
        builder.sub_divide4();
        builder.sub_divide4();
        assert_eq!(builder.triangle_count(), 16);
        assert!(builder.is_connected());
        assert_links_symmetric(&builder);

        let open: usize = builder
            .triangles()
            .iter()
            .map(|t| (0..3).filter(|&e| t.link(e).is_none()).count())
            .sum();
        assert_eq!(open, 12);
    }
}
