//! Subdivided quad patches.

use super::MeshBuilder;
use crate::triangle::{self, positions_match, Triangle, TriangleId, Vertex};
use glam::{Vec2, Vec3, Vec4};

/// Corners of a quad patch, ordered bottom-left, bottom-right, top-right,
/// top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCorners {
    pub positions: [Vec3; 4],
    pub uvs: [Vec2; 4],
}

impl QuadCorners {
    /// Corners with the unit UV square mapped onto them.
    pub fn new(positions: [Vec3; 4]) -> Self {
        Self {
            positions,
            uvs: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
        }
    }

    /// Bilinear position at `(u, v)` in patch space.
    fn position(&self, u: f32, v: f32) -> Vec3 {
        let [bl, br, tr, tl] = self.positions;
        bl.lerp(br, u).lerp(tl.lerp(tr, u), v)
    }

    fn uv(&self, u: f32, v: f32) -> Vec2 {
        let [bl, br, tr, tl] = self.uvs;
        bl.lerp(br, u).lerp(tl.lerp(tr, u), v)
    }

    fn is_parallelogram(&self, epsilon: f32) -> bool {
        let [bl, br, tr, tl] = self.positions;
        positions_match(bl + tr, br + tl, epsilon)
    }
}

/// Triangles created by [`MeshBuilder::add_subdiv_quad`] and their open
/// border edges.
///
/// Border lists run along the patch from its bottom-left or bottom-right
/// corner, one entry per grid cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubdivQuad {
    pub triangles: Vec<TriangleId>,
    pub bottom: Vec<(TriangleId, u8)>,
    pub right: Vec<(TriangleId, u8)>,
    pub top: Vec<(TriangleId, u8)>,
    pub left: Vec<(TriangleId, u8)>,
}

impl SubdivQuad {
    /// Every border edge, for stitching against neighbouring patches.
    pub fn border_edges(&self) -> Vec<(TriangleId, u8)> {
        self.bottom
            .iter()
            .chain(&self.right)
            .chain(&self.top)
            .chain(&self.left)
            .copied()
            .collect()
    }
}

/// Tangent along increasing U for a triangle, orthogonalized against
/// `normal`; handedness in `w`.
fn uv_tangent(positions: [Vec3; 3], uvs: [Vec2; 3], normal: Vec3) -> Vec4 {
    let e1 = positions[1] - positions[0];
    let e2 = positions[2] - positions[0];
    let d1 = uvs[1] - uvs[0];
    let d2 = uvs[2] - uvs[0];
    let det = d1.x * d2.y - d2.x * d1.y;

    let (tangent, bitangent) = if det.abs() > f32::EPSILON {
        let r = 1.0 / det;
        ((e1 * d2.y - e2 * d1.y) * r, (e2 * d1.x - e1 * d2.x) * r)
    } else {
        (e1, normal.cross(e1))
    };

    let tangent = (tangent - normal * normal.dot(tangent)).normalize_or_zero();
    let tangent = if tangent == Vec3::ZERO {
        normal.any_orthonormal_vector()
    } else {
        tangent
    };
    let w = if normal.cross(tangent).dot(bitangent) < 0.0 { -1.0 } else { 1.0 };
    tangent.extend(w)
}

impl MeshBuilder {
    /// Adds a grid of `subdivisions x subdivisions` cells over `corners`.
    ///
    /// Every vertex gets the flat face normal of the quad. Tangents come
    /// from the UV gradient, once for a parallelogram and per column
    /// otherwise. Internal edges are connected; border edges are left open
    /// and returned for stitching.
    ///
    /// Each cell `(i, j)` holds two triangles `[p00, p10, p11]` and
    /// `[p00, p11, p01]`.
    pub fn add_subdiv_quad(
        &mut self,
        corners: &QuadCorners,
        subdivisions: u32,
        material: Option<u32>,
    ) -> SubdivQuad {
        let s = subdivisions.max(1) as usize;
        let step = 1.0 / s as f32;
        let [bl, br, tr, tl] = corners.positions;
        let normal = (tr - bl).cross(tl - br).normalize_or_zero();

        let column_tangent = |column: usize| {
            let (u0, u1) = (column as f32 * step, (column + 1) as f32 * step);
            uv_tangent(
                [
                    corners.position(u0, 0.0),
                    corners.position(u1, 0.0),
                    corners.position(u0, 1.0),
                ],
                [corners.uv(u0, 0.0), corners.uv(u1, 0.0), corners.uv(u0, 1.0)],
                normal,
            )
        };
        let tangents: Vec<Vec4> = if corners.is_parallelogram(self.config.position_epsilon) {
            vec![column_tangent(0); s]
        } else {
            (0..s).map(column_tangent).collect()
        };

        let vertex = |i: usize, j: usize, tangent: Vec4| {
            let (u, v) = (i as f32 * step, j as f32 * step);
            Vertex {
                position: corners.position(u, v),
                normal,
                uv: corners.uv(u, v),
                tangent,
            }
        };

        let base = self.triangles.len();
        let lower = |i: usize, j: usize| TriangleId((base + 2 * (j * s + i)) as u32);
        let upper = |i: usize, j: usize| TriangleId((base + 2 * (j * s + i) + 1) as u32);

        let mut quad = SubdivQuad::default();
        for j in 0..s {
            for (i, &tangent) in tangents.iter().enumerate() {
                let p00 = vertex(i, j, tangent);
                let p10 = vertex(i + 1, j, tangent);
                let p11 = vertex(i + 1, j + 1, tangent);
                let p01 = vertex(i, j + 1, tangent);

                let mut t0 = Triangle::new([p00, p10, p11]);
                let mut t1 = Triangle::new([p00, p11, p01]);
                t0.set_material(material);
                t1.set_material(material);
                quad.triangles.push(self.add_triangle(t0));
                quad.triangles.push(self.add_triangle(t1));
            }
        }

        for j in 0..s {
            for i in 0..s {
                triangle::connect_edge(&mut self.triangles, lower(i, j), 2, upper(i, j), 0);
                if i + 1 < s {
                    triangle::connect_edge(&mut self.triangles, lower(i, j), 1, upper(i + 1, j), 2);
                }
                if j + 1 < s {
                    triangle::connect_edge(&mut self.triangles, upper(i, j), 1, lower(i, j + 1), 0);
                }
            }
        }

        quad.bottom = (0..s).map(|i| (lower(i, 0), 0)).collect();
        quad.right = (0..s).map(|j| (lower(s - 1, j), 1)).collect();
        quad.top = (0..s).map(|i| (upper(i, s - 1), 1)).collect();
        quad.left = (0..s).map(|j| (upper(0, j), 2)).collect();
        quad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> QuadCorners {
        QuadCorners::new([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn test_single_cell_quad() {
        let mut builder = MeshBuilder::new();
        let quad = builder.add_subdiv_quad(&unit_square(), 1, Some(4));
        assert_eq!(quad.triangles.len(), 2);
        assert!(builder.is_connected());
        assert_eq!(quad.border_edges().len(), 4);

        for &id in &quad.triangles {
            let triangle = builder.triangle(id).unwrap();
            assert_eq!(triangle.material(), Some(4));
            assert_relative_eq!(triangle.face_normal().z, 1.0);
            for i in 0..3 {
                assert_eq!(triangle.normal(i), Vec3::Z);
                assert_eq!(triangle.tangent(i), Vec4::new(1.0, 0.0, 0.0, 1.0));
                let position = triangle.position(i);
                assert_eq!(triangle.uv(i), Vec2::new(position.x, position.y));
            }
        }
    }

    #[test]
    fn test_grid_edges() {
        let mut builder = MeshBuilder::new();
        let quad = builder.add_subdiv_quad(&unit_square(), 3, None);
        assert_eq!(quad.triangles.len(), 18);
        assert!(builder.is_connected());

        let borders = quad.border_edges();
        assert_eq!(borders.len(), 12);
        for &(id, edge) in &borders {
            assert!(builder.connected_edge(id, edge).unwrap().is_none());
        }
        let open: usize = builder
            .triangles()
            .iter()
            .map(|t| (0..3).filter(|&e| t.link(e).is_none()).count())
            .sum();
        assert_eq!(open, borders.len());
    }

    #[test]
    fn test_adjacent_patches_stitch() {
        let mut builder = MeshBuilder::new();
        let front = builder.add_subdiv_quad(&unit_square(), 2, None);
        let side = builder.add_subdiv_quad(
            &QuadCorners::new([
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, 0.0),
            ]),
            2,
            None,
        );
        builder
            .auto_connect_edges(&front.right, &side.triangles)
            .unwrap();
        assert!(builder.is_connected());
        for &(id, edge) in &side.left {
            assert!(builder.connected_edge(id, edge).unwrap().is_some());
        }
    }

    #[test]
    fn test_trapezoid_tangents_follow_u() {
        let mut builder = MeshBuilder::new();
        let corners = QuadCorners::new([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]);
        let quad = builder.add_subdiv_quad(&corners, 2, None);
        for &id in &quad.triangles {
            let triangle = builder.triangle(id).unwrap();
            for i in 0..3 {
                let tangent = triangle.tangent(i);
                assert_relative_eq!(tangent.truncate().length(), 1.0, epsilon = 1e-5);
                assert!(tangent.x > 0.0);
                assert_relative_eq!(tangent.z, 0.0);
            }
        }
    }
}
