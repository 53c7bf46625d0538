//! # Triangle
//!
//! One triangle of a connected mesh: three interleaved vertex records plus
//! edge adjacency.
//!
//! Triangles live in an arena owned by [`crate::MeshBuilder`] and refer to
//! each other through [`TriangleId`] indices. Edge `i` runs from vertex `i`
//! to vertex `(i + 1) % 3`. Links are always symmetric: if edge `i` of A
//! links to edge `j` of B, edge `j` of B links to edge `i` of A.

use config::constants::{
    NORMALIZE_EPSILON, NORMAL_OFFSET, POSITION_OFFSET, TANGENT_OFFSET, UV_OFFSET, VERTEX_STRIDE,
};
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a triangle inside its builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriangleId(pub u32);

impl TriangleId {
    /// Position in the owning arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Far side of a connected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeLink {
    /// Adjacent triangle.
    pub triangle: TriangleId,
    /// Matching edge index on the adjacent triangle.
    pub edge: u8,
}

impl EdgeLink {
    pub fn new(triangle: TriangleId, edge: u8) -> Self {
        Self { triangle, edge }
    }
}

/// Unpacked vertex record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// Tangent direction with handedness in `w`.
    pub tangent: Vec4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            tangent: Vec4::ZERO,
        }
    }
}

impl Vertex {
    /// Vertex with only a position; other attributes are zero.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Packs into an interleaved record.
    pub fn to_record(&self) -> [f32; VERTEX_STRIDE] {
        let mut record = [0.0; VERTEX_STRIDE];
        write_vertex(&mut record, self);
        record
    }

    /// Reads an interleaved record.
    pub fn from_record(record: &[f32]) -> Self {
        Self {
            position: Vec3::from_slice(&record[POSITION_OFFSET..]),
            normal: Vec3::from_slice(&record[NORMAL_OFFSET..]),
            uv: Vec2::from_slice(&record[UV_OFFSET..]),
            tangent: Vec4::from_slice(&record[TANGENT_OFFSET..]),
        }
    }

    /// Attribute-wise midpoint; normal and tangent are renormalized.
    pub fn midpoint(a: &Vertex, b: &Vertex) -> Vertex {
        let normal = (a.normal + b.normal).normalize_or_zero();
        let direction = (a.tangent.truncate() + b.tangent.truncate()).normalize_or_zero();
        let handedness = if a.tangent.w < 0.0 { -1.0 } else if a.tangent.w > 0.0 { 1.0 } else { 0.0 };
        Vertex {
            position: (a.position + b.position) * 0.5,
            normal,
            uv: (a.uv + b.uv) * 0.5,
            tangent: direction.extend(handedness),
        }
    }
}

fn write_vertex(record: &mut [f32], vertex: &Vertex) {
    vertex
        .position
        .write_to_slice(&mut record[POSITION_OFFSET..NORMAL_OFFSET]);
    vertex.normal.write_to_slice(&mut record[NORMAL_OFFSET..UV_OFFSET]);
    vertex.uv.write_to_slice(&mut record[UV_OFFSET..TANGENT_OFFSET]);
    vertex
        .tangent
        .write_to_slice(&mut record[TANGENT_OFFSET..VERTEX_STRIDE]);
}

/// Component-wise position comparison within `epsilon`.
#[inline]
pub fn positions_match(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    (a - b).abs().max_element() <= epsilon
}

/// A triangle with interleaved vertex data and edge adjacency.
///
/// # Example
///
/// ```rust
/// use mesh_builder::{Triangle, Vertex};
/// use glam::Vec3;
///
/// let tri = Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]);
/// assert_eq!(tri.normal(0), Vec3::Z);
/// assert!(tri.link(0).is_none());
/// assert_eq!(tri.vertex(1), Vertex { normal: Vec3::Z, ..Vertex::at(Vec3::X) });
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    data: [f32; 3 * VERTEX_STRIDE],
    links: [Option<EdgeLink>; 3],
    material: Option<u32>,
}

impl Default for Triangle {
    fn default() -> Self {
        Self {
            data: [0.0; 3 * VERTEX_STRIDE],
            links: [None; 3],
            material: None,
        }
    }
}

impl Triangle {
    /// Creates an unconnected triangle from three vertices.
    pub fn new(vertices: [Vertex; 3]) -> Self {
        let mut triangle = Self::default();
        for (i, vertex) in vertices.iter().enumerate() {
            triangle.set_vertex(i, vertex);
        }
        triangle
    }

    /// Creates a triangle with a flat face normal and zeroed UVs/tangents.
    pub fn from_positions(positions: [Vec3; 3]) -> Self {
        let mut triangle = Self::new(positions.map(Vertex::at));
        let normal = triangle.face_normal();
        for i in 0..3 {
            triangle.set_normal(i, normal);
        }
        triangle
    }

    // =========================================================================
    // VERTEX ATTRIBUTES
    // =========================================================================

    #[inline]
    fn offset(vertex: usize, attribute: usize) -> usize {
        debug_assert!(vertex < 3);
        vertex * VERTEX_STRIDE + attribute
    }

    /// Interleaved records of all three vertices.
    #[inline]
    pub fn data(&self) -> &[f32; 3 * VERTEX_STRIDE] {
        &self.data
    }

    /// Interleaved record of one vertex.
    #[inline]
    pub fn record(&self, vertex: usize) -> &[f32] {
        let start = Self::offset(vertex, 0);
        &self.data[start..start + VERTEX_STRIDE]
    }

    pub fn vertex(&self, vertex: usize) -> Vertex {
        Vertex::from_record(self.record(vertex))
    }

    pub fn set_vertex(&mut self, vertex: usize, value: &Vertex) {
        let start = Self::offset(vertex, 0);
        write_vertex(&mut self.data[start..start + VERTEX_STRIDE], value);
    }

    #[inline]
    pub fn position(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.data[Self::offset(vertex, POSITION_OFFSET)..])
    }

    #[inline]
    pub fn set_position(&mut self, vertex: usize, position: Vec3) {
        let start = Self::offset(vertex, POSITION_OFFSET);
        position.write_to_slice(&mut self.data[start..start + 3]);
    }

    #[inline]
    pub fn normal(&self, vertex: usize) -> Vec3 {
        Vec3::from_slice(&self.data[Self::offset(vertex, NORMAL_OFFSET)..])
    }

    #[inline]
    pub fn set_normal(&mut self, vertex: usize, normal: Vec3) {
        let start = Self::offset(vertex, NORMAL_OFFSET);
        normal.write_to_slice(&mut self.data[start..start + 3]);
    }

    #[inline]
    pub fn uv(&self, vertex: usize) -> Vec2 {
        Vec2::from_slice(&self.data[Self::offset(vertex, UV_OFFSET)..])
    }

    #[inline]
    pub fn set_uv(&mut self, vertex: usize, uv: Vec2) {
        let start = Self::offset(vertex, UV_OFFSET);
        uv.write_to_slice(&mut self.data[start..start + 2]);
    }

    #[inline]
    pub fn tangent(&self, vertex: usize) -> Vec4 {
        Vec4::from_slice(&self.data[Self::offset(vertex, TANGENT_OFFSET)..])
    }

    #[inline]
    pub fn set_tangent(&mut self, vertex: usize, tangent: Vec4) {
        let start = Self::offset(vertex, TANGENT_OFFSET);
        tangent.write_to_slice(&mut self.data[start..start + 4]);
    }

    /// Swaps two vertex records.
    pub(crate) fn swap_vertices(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for k in 0..VERTEX_STRIDE {
            self.data.swap(Self::offset(a, k), Self::offset(b, k));
        }
    }

    // =========================================================================
    // GEOMETRY
    // =========================================================================

    /// Unit normal of the triangle plane, or zero if degenerate.
    pub fn face_normal(&self) -> Vec3 {
        self.scaled_normal().normalize_or_zero()
    }

    /// Surface area.
    pub fn area(&self) -> f32 {
        self.scaled_normal().length() * 0.5
    }

    fn scaled_normal(&self) -> Vec3 {
        let p0 = self.position(0);
        (self.position(1) - p0).cross(self.position(2) - p0)
    }

    /// Finds the edge of `other` that runs opposite to `edge` of `self`.
    ///
    /// Only reversed edges match: a neighbor with flipped winding shares the
    /// positions in the same order and is never considered a match.
    pub fn matching_edge(&self, edge: u8, other: &Triangle, epsilon: f32) -> Option<u8> {
        let start = self.position(edge as usize);
        let end = self.position((edge as usize + 1) % 3);
        (0..3u8).find(|&j| {
            positions_match(start, other.position((j as usize + 1) % 3), epsilon)
                && positions_match(end, other.position(j as usize), epsilon)
        })
    }

    /// Projects every vertex onto the unit sphere.
    ///
    /// The normal becomes the position and the tangent follows the
    /// parallel through the vertex.
    pub fn normalize(&mut self) {
        for i in 0..3 {
            let position = self.position(i).normalize_or_zero();
            let meridian = Vec3::new(position.z, 0.0, -position.x);
            let tangent = if meridian.length_squared() > NORMALIZE_EPSILON {
                meridian.normalize()
            } else {
                Vec3::X
            };
            self.set_position(i, position);
            self.set_normal(i, position);
            self.set_tangent(i, tangent.extend(1.0));
        }
    }

    // =========================================================================
    // ADJACENCY
    // =========================================================================

    /// Link stored on `edge`, if connected.
    #[inline]
    pub fn link(&self, edge: u8) -> Option<EdgeLink> {
        self.links[edge as usize]
    }

    #[inline]
    pub(crate) fn set_link(&mut self, edge: u8, link: Option<EdgeLink>) {
        self.links[edge as usize] = link;
    }

    /// True if every edge is connected.
    pub fn is_closed(&self) -> bool {
        self.links.iter().all(Option::is_some)
    }

    #[inline]
    pub fn material(&self) -> Option<u32> {
        self.material
    }

    #[inline]
    pub fn set_material(&mut self, material: Option<u32>) {
        self.material = material;
    }
}

// =============================================================================
// ARENA OPERATIONS
// =============================================================================

/// Clears the link on `edge` of `id` and the link pointing back to it.
pub(crate) fn disconnect_edge(triangles: &mut [Triangle], id: TriangleId, edge: u8) {
    if let Some(link) = triangles[id.index()].link(edge) {
        let other = &mut triangles[link.triangle.index()];
        if other.link(link.edge) == Some(EdgeLink::new(id, edge)) {
            other.set_link(link.edge, None);
        }
        triangles[id.index()].set_link(edge, None);
    }
}

/// Links `edge` of `a` with `other_edge` of `b`, clearing any prior link on
/// either edge first.
pub(crate) fn connect_edge(
    triangles: &mut [Triangle],
    a: TriangleId,
    edge: u8,
    b: TriangleId,
    other_edge: u8,
) {
    disconnect_edge(triangles, a, edge);
    disconnect_edge(triangles, b, other_edge);
    triangles[a.index()].set_link(edge, Some(EdgeLink::new(b, other_edge)));
    triangles[b.index()].set_link(other_edge, Some(EdgeLink::new(a, edge)));
}

/// Ordered corners sharing the position of `vertex` on triangle `start`.
///
/// Walks across edge `v` of each visited corner until a dead end or a loop
/// back to the start. When the walk is open, a second walk across edge
/// `(v + 2) % 3` collects the other side, which is prepended so the result
/// stays in rotational order.
pub(crate) fn vertex_star(
    triangles: &[Triangle],
    start: TriangleId,
    vertex: u8,
) -> Vec<(TriangleId, u8)> {
    let limit = triangles.len();
    let mut star = vec![(start, vertex)];

    let (mut current, mut local) = (start, vertex);
    let mut closed = false;
    for _ in 0..limit {
        let Some(link) = triangles[current.index()].link(local) else {
            break;
        };
        let next = (link.triangle, (link.edge + 1) % 3);
        if next == (start, vertex) {
            closed = true;
            break;
        }
        star.push(next);
        (current, local) = next;
    }
    if closed {
        return star;
    }

    let mut other_side = Vec::new();
    let (mut current, mut local) = (start, vertex);
    for _ in 0..limit {
        let Some(link) = triangles[current.index()].link((local + 2) % 3) else {
            break;
        };
        let next = (link.triangle, link.edge);
        if next == (start, vertex) || star.contains(&next) {
            break;
        }
        other_side.push(next);
        (current, local) = next;
    }
    other_side.reverse();
    other_side.extend(star);
    other_side
}
