//! # Mesh Builder
//!
//! Arena of connected triangles with the passes that operate on it:
//! stitching, subdivision, smoothing, UV generation and finalization.
//!
//! ## Example
//!
//! ```rust
//! use mesh_builder::{MeshBuilder, Triangle};
//! use glam::Vec3;
//!
//! let mut builder = MeshBuilder::new();
//! let a = builder.add_triangle(Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]));
//! let b = builder.add_triangle(Triangle::from_positions([Vec3::X, Vec3::ONE, Vec3::Y]));
//! builder.auto_connect_all_edges(&[a, b]);
//! assert!(builder.connected_edge(a, 1).unwrap().is_some());
//! assert!(builder.is_connected());
//! ```

mod finalize;
mod quad;
mod smoothing;
mod subdivide;
mod uv;

pub use finalize::{FinalizeHints, FinalizedMesh, FinalizedSubmesh, ManifoldBuffers};
pub use quad::{QuadCorners, SubdivQuad};

use crate::bit_array::BitArray;
use crate::error::{MeshError, MeshResult};
use crate::triangle::{self, EdgeLink, Triangle, TriangleId};
use config::constants::BuilderConfig;
use glam::{Mat3, Mat4, Vec4Swizzles};
use hashbrown::HashSet;

/// Owns the triangles of one procedural mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    triangles: Vec<Triangle>,
    config: BuilderConfig,
}

impl MeshBuilder {
    /// Creates an empty builder with the default stitching tolerance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty builder with explicit settings.
    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            triangles: Vec::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// All triangles in arena order.
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Identifiers of every triangle, in arena order.
    pub fn ids(&self) -> impl Iterator<Item = TriangleId> {
        (0..self.triangles.len() as u32).map(TriangleId)
    }

    /// Consumes the builder, returning its triangles.
    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    /// Appends an unconnected triangle.
    ///
    /// Existing links on `triangle` are dropped; adjacency is only created
    /// through the builder.
    pub fn add_triangle(&mut self, mut triangle: Triangle) -> TriangleId {
        for edge in 0..3 {
            triangle.set_link(edge, None);
        }
        let id = TriangleId(self.triangles.len() as u32);
        self.triangles.push(triangle);
        id
    }

    pub fn triangle(&self, id: TriangleId) -> MeshResult<&Triangle> {
        self.triangles
            .get(id.index())
            .ok_or(MeshError::InvalidTriangle(id))
    }

    /// Mutable access to vertex data and material.
    pub fn triangle_mut(&mut self, id: TriangleId) -> MeshResult<&mut Triangle> {
        self.triangles
            .get_mut(id.index())
            .ok_or(MeshError::InvalidTriangle(id))
    }

    pub fn set_material(&mut self, id: TriangleId, material: Option<u32>) -> MeshResult<()> {
        self.triangle_mut(id)?.set_material(material);
        Ok(())
    }

    fn check_id(&self, id: TriangleId) -> MeshResult<()> {
        self.triangle(id).map(|_| ())
    }

    fn check_corner(corner: u8) -> MeshResult<()> {
        if corner < 3 {
            Ok(())
        } else {
            Err(MeshError::InvalidCorner(corner))
        }
    }

    // =========================================================================
    // CONNECTIVITY
    // =========================================================================

    /// Links edge `edge` of `a` with edge `other_edge` of `b`.
    ///
    /// Any existing link on either edge is cleared first, on both sides.
    pub fn connect_edge(
        &mut self,
        a: TriangleId,
        edge: u8,
        b: TriangleId,
        other_edge: u8,
    ) -> MeshResult<()> {
        self.check_id(a)?;
        self.check_id(b)?;
        Self::check_corner(edge)?;
        Self::check_corner(other_edge)?;
        triangle::connect_edge(&mut self.triangles, a, edge, b, other_edge);
        Ok(())
    }

    /// Clears the link on `edge` of `id` on both sides. No-op if unlinked.
    pub fn disconnect_edge(&mut self, id: TriangleId, edge: u8) -> MeshResult<()> {
        self.check_id(id)?;
        Self::check_corner(edge)?;
        triangle::disconnect_edge(&mut self.triangles, id, edge);
        Ok(())
    }

    pub fn connected_edge(&self, id: TriangleId, edge: u8) -> MeshResult<Option<EdgeLink>> {
        Self::check_corner(edge)?;
        Ok(self.triangle(id)?.link(edge))
    }

    /// Corners sharing the position of `vertex` on `id`, in rotational order.
    pub fn vertex_star(&self, id: TriangleId, vertex: u8) -> MeshResult<Vec<(TriangleId, u8)>> {
        self.check_id(id)?;
        Self::check_corner(vertex)?;
        Ok(triangle::vertex_star(&self.triangles, id, vertex))
    }

    /// First open edge among `candidates` that runs opposite to `edge` of
    /// `id` and is accepted by `free`.
    fn find_open_match(
        &self,
        id: TriangleId,
        edge: u8,
        candidates: impl IntoIterator<Item = TriangleId>,
        free: impl Fn(TriangleId, u8) -> bool,
    ) -> Option<(TriangleId, u8)> {
        let source = &self.triangles[id.index()];
        let epsilon = self.config.position_epsilon;
        candidates.into_iter().find_map(|other_id| {
            if other_id == id {
                return None;
            }
            let other = self.triangles.get(other_id.index())?;
            source
                .matching_edge(edge, other, epsilon)
                .filter(|&j| other.link(j).is_none() && free(other_id, j))
                .map(|j| (other_id, j))
        })
    }

    /// Connects every open edge of `ids` to the first open, reversed,
    /// position-matching edge on a later triangle of `ids`.
    ///
    /// Existing links are never overwritten. Quadratic in `ids.len()`.
    ///
    /// ## Returns
    ///
    /// Number of edge pairs connected.
    pub fn auto_connect_all_edges(&mut self, ids: &[TriangleId]) -> usize {
        let mut connected = 0;
        for (i, &id) in ids.iter().enumerate() {
            if id.index() >= self.triangles.len() {
                continue;
            }
            for edge in 0..3u8 {
                if self.triangles[id.index()].link(edge).is_some() {
                    continue;
                }
                if let Some((other, other_edge)) =
                    self.find_open_match(id, edge, ids[i + 1..].iter().copied(), |_, _| true)
                {
                    triangle::connect_edge(&mut self.triangles, id, edge, other, other_edge);
                    connected += 1;
                }
            }
        }
        connected
    }

    /// Runs [`Self::auto_connect_all_edges`] over the whole arena.
    pub fn auto_connect_all(&mut self) -> usize {
        let ids: Vec<TriangleId> = self.ids().collect();
        self.auto_connect_all_edges(&ids)
    }

    /// Stitches each requested edge to an open matching edge among
    /// `connectable`.
    ///
    /// Edges that are already linked, or claimed by an earlier request,
    /// count as satisfied. Every match is found before any link is written.
    ///
    /// ## Errors
    ///
    /// [`MeshError::UnconnectedEdge`] for the first edge without a match;
    /// the builder is left unchanged.
    pub fn auto_connect_edges(
        &mut self,
        edges: &[(TriangleId, u8)],
        connectable: &[TriangleId],
    ) -> MeshResult<()> {
        let mut claimed: HashSet<(TriangleId, u8)> = HashSet::new();
        let mut planned = Vec::new();
        for &(id, edge) in edges {
            self.check_id(id)?;
            Self::check_corner(edge)?;
            if self.triangles[id.index()].link(edge).is_some() || claimed.contains(&(id, edge)) {
                continue;
            }
            let (other, other_edge) = self
                .find_open_match(id, edge, connectable.iter().copied(), |t, e| {
                    !claimed.contains(&(t, e))
                })
                .ok_or(MeshError::UnconnectedEdge { triangle: id, edge })?;
            claimed.insert((id, edge));
            claimed.insert((other, other_edge));
            planned.push((id, edge, other, other_edge));
        }
        for (id, edge, other, other_edge) in planned {
            triangle::connect_edge(&mut self.triangles, id, edge, other, other_edge);
        }
        Ok(())
    }

    /// Number of triangles reachable from triangle 0 through edge links.
    pub fn reachable_count(&self) -> usize {
        if self.triangles.is_empty() {
            return 0;
        }
        let mut visited = BitArray::new(self.triangles.len());
        let mut stack = vec![0usize];
        visited.insert(0);
        let mut reached = 1;
        while let Some(index) = stack.pop() {
            for edge in 0..3 {
                if let Some(link) = self.triangles[index].link(edge) {
                    if visited.insert(link.triangle.index()) {
                        reached += 1;
                        stack.push(link.triangle.index());
                    }
                }
            }
        }
        reached
    }

    /// True if every triangle is reachable from triangle 0.
    pub fn is_connected(&self) -> bool {
        self.reachable_count() == self.triangles.len()
    }

    /// Fails with [`MeshError::Disconnected`] unless the mesh is connected.
    pub fn check_connected(&self) -> MeshResult<()> {
        let reached = self.reachable_count();
        if reached == self.triangles.len() {
            Ok(())
        } else {
            Err(MeshError::Disconnected {
                reached,
                total: self.triangles.len(),
            })
        }
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    /// Applies an affine transform to every vertex.
    ///
    /// Normals use the inverse transpose, tangents the linear part. A
    /// negative determinant flips the winding of every triangle and the
    /// tangent handedness, keeping adjacency intact.
    pub fn transform(&mut self, matrix: &Mat4) {
        let linear = Mat3::from_mat4(*matrix);
        let determinant = linear.determinant();
        let normal_matrix = if determinant.abs() > f32::EPSILON {
            linear.inverse().transpose()
        } else {
            linear
        };
        let handedness = if determinant < 0.0 { -1.0 } else { 1.0 };

        for triangle in &mut self.triangles {
            for i in 0..3 {
                triangle.set_position(i, matrix.transform_point3(triangle.position(i)));
                triangle.set_normal(i, (normal_matrix * triangle.normal(i)).normalize_or_zero());
                let tangent = triangle.tangent(i);
                let direction = (linear * tangent.xyz()).normalize_or_zero();
                triangle.set_tangent(i, direction.extend(tangent.w * handedness));
            }
        }

        if determinant < 0.0 {
            self.flip_winding();
        }
    }

    /// Reverses the winding of every triangle, remapping edge links.
    fn flip_winding(&mut self) {
        let remap = |edge: u8| match edge {
            0 => 2,
            2 => 0,
            other => other,
        };
        for triangle in &mut self.triangles {
            triangle.swap_vertices(1, 2);
            let links = [triangle.link(0), triangle.link(1), triangle.link(2)];
            for (edge, link) in links.into_iter().enumerate() {
                let link = link.map(|l| EdgeLink::new(l.triangle, remap(l.edge)));
                triangle.set_link(remap(edge as u8), link);
            }
        }
    }
}
