//! # Solid
//!
//! A closed polygon soup plus the original IDs it was built from.
//!
//! Each polygon remembers the original ID of the mesh it came from; the
//! solid maps every such ID to the affine transform taking the original
//! mesh into the solid's frame. Export groups triangles into one run per
//! original ID.

use std::collections::BTreeMap;

use config::constants::KERNEL_EPSILON;
use csg_tree::BooleanOp;
use glam::{DAffine3, DVec3};
use hashbrown::{HashMap, HashSet};

use crate::bsp::{self, edge_point, BspVertex, Polygon};
use crate::error::{KernelError, KernelResult};
use crate::kernel::Measurements;
use crate::mesh_gl::{affine_to_columns, MeshGl};
use crate::triangulate::{project, triangulate};

/// Distance under which exported corners are treated as one point.
const WELD_EPSILON: f64 = 1e-9;

/// Solid stored as convex polygons.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    polygons: Vec<Polygon>,
    origins: BTreeMap<u32, DAffine3>,
    /// Properties per vertex after the position.
    extra_props: usize,
}

/// Triangle produced when exporting a solid.
#[derive(Debug, Clone)]
struct ExportTriangle {
    origin: u32,
    corners: [BspVertex; 3],
}

impl Solid {
    /// Solid from position-only faces tagged with a single original ID.
    ///
    /// Faces with no area are skipped.
    pub fn from_faces(faces: Vec<Vec<DVec3>>, origin: u32) -> Self {
        let polygons = faces
            .into_iter()
            .filter_map(|face| {
                Polygon::new(face.into_iter().map(BspVertex::at).collect(), origin, None)
            })
            .collect();
        Self {
            polygons,
            origins: BTreeMap::from([(origin, DAffine3::IDENTITY)]),
            extra_props: 0,
        }
    }

    /// Solid from an interchange mesh.
    ///
    /// Triangles of run `r` get original ID `run_original_id[r]`; without
    /// runs every triangle gets `fallback_id`.
    ///
    /// ## Errors
    ///
    /// Returns [`KernelError::InvalidMesh`] if the buffers are malformed or
    /// the surface is not closed.
    pub fn from_mesh_gl(
        mesh: &MeshGl,
        fallback_id: u32,
        normal_offset: Option<usize>,
    ) -> KernelResult<Self> {
        mesh.validate()?;
        let normal_prop = match normal_offset {
            Some(offset) if offset < 3 || offset + 3 > mesh.num_prop => {
                return Err(KernelError::invalid_mesh(format!(
                    "normal channel {offset} outside {} properties",
                    mesh.num_prop
                )));
            }
            Some(offset) => Some(offset - 3),
            None => None,
        };
        check_closed(mesh)?;

        let runs: Vec<(u32, usize, usize, DAffine3)> = if mesh.num_runs() == 0 {
            vec![(fallback_id, 0, mesh.num_tri(), DAffine3::IDENTITY)]
        } else {
            (0..mesh.num_runs())
                .map(|run| {
                    let (start, end) = mesh.run_triangles(run);
                    (mesh.run_original_id[run], start, end, mesh.run_affine(run))
                })
                .collect()
        };

        let mut solid = Solid {
            extra_props: mesh.num_prop - 3,
            ..Solid::default()
        };
        for (origin, start, end, affine) in runs {
            solid.origins.entry(origin).or_insert(affine);
            for tri in start..end {
                let corners = (0..3)
                    .map(|k| {
                        let v = mesh.tri_verts[tri * 3 + k] as usize;
                        BspVertex::new(
                            mesh.position(v),
                            mesh.properties(v).iter().map(|&p| f64::from(p)).collect(),
                        )
                    })
                    .collect();
                if let Some(polygon) = Polygon::new(corners, origin, normal_prop) {
                    solid.polygons.push(polygon);
                }
            }
        }
        Ok(solid)
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn num_prop(&self) -> usize {
        self.extra_props + 3
    }

    /// Original IDs with their transforms, ascending.
    pub fn origins(&self) -> &BTreeMap<u32, DAffine3> {
        &self.origins
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Boolean combination; property widths are padded to the wider input.
    pub fn boolean(op: BooleanOp, a: &Solid, b: &Solid) -> Solid {
        let extra_props = a.extra_props.max(b.extra_props);
        let padded = |solid: &Solid| {
            let mut polygons = solid.polygons.clone();
            if solid.extra_props < extra_props {
                polygons.iter_mut().for_each(|p| p.pad_props(extra_props));
            }
            polygons
        };
        let polygons = bsp::boolean(op, padded(a), padded(b));

        let used: HashSet<u32> = polygons.iter().map(Polygon::origin).collect();
        let origins = a
            .origins
            .iter()
            .chain(b.origins.iter())
            .filter(|(id, _)| used.contains(*id))
            .fold(BTreeMap::new(), |mut acc, (&id, &affine)| {
                acc.entry(id).or_insert(affine);
                acc
            });

        Solid {
            polygons,
            origins,
            extra_props,
        }
    }

    /// Applies an affine transform. Normal channels follow the
    /// inverse-transpose; a mirroring transform reverses winding.
    pub fn transform(&self, affine: &DAffine3) -> Solid {
        let normal_matrix = affine.matrix3.inverse().transpose();
        let mirrored = affine.matrix3.determinant() < 0.0;

        let polygons = self
            .polygons
            .iter()
            .filter_map(|polygon| {
                let normal_offset = polygon.normal_offset();
                let mut vertices: Vec<BspVertex> = polygon
                    .vertices()
                    .iter()
                    .map(|v| {
                        let mut out = BspVertex::new(affine.transform_point3(v.position), v.props.clone());
                        if let Some(n) = normal_offset.and_then(|o| out.props.get_mut(o..o + 3)) {
                            let mapped = (normal_matrix * DVec3::new(n[0], n[1], n[2])).normalize_or_zero();
                            n.copy_from_slice(&mapped.to_array());
                        }
                        out
                    })
                    .collect();
                if mirrored {
                    vertices.reverse();
                }
                Polygon::new(vertices, polygon.origin(), normal_offset)
            })
            .collect();

        Solid {
            polygons,
            origins: self
                .origins
                .iter()
                .map(|(&id, existing)| (id, *affine * *existing))
                .collect(),
            extra_props: self.extra_props,
        }
    }

    /// Splits every edge into `n` pieces.
    pub fn refine(&self, n: u32) -> Solid {
        if n <= 1 {
            return self.clone();
        }
        let mut polygons = Vec::new();
        for polygon in &self.polygons {
            for [a, b, c] in triangulate_polygon(polygon) {
                for corners in refine_triangle(&a, &b, &c, n) {
                    if let Some(p) = Polygon::new(corners.to_vec(), polygon.origin(), polygon.normal_offset()) {
                        polygons.push(p);
                    }
                }
            }
        }
        Solid {
            polygons,
            origins: self.origins.clone(),
            extra_props: self.extra_props,
        }
    }

    /// Re-tags every polygon with `origin` and forgets prior transforms.
    pub fn as_original(&self, origin: u32) -> Solid {
        let mut polygons = self.polygons.clone();
        polygons.iter_mut().for_each(|p| p.set_origin(origin));
        Solid {
            polygons,
            origins: BTreeMap::from([(origin, DAffine3::IDENTITY)]),
            extra_props: self.extra_props,
        }
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Exports the solid with one run per original ID, ascending.
    pub fn to_mesh_gl(&self) -> MeshGl {
        let num_prop = self.num_prop();
        let mut triangles = self.triangles();
        triangles.sort_by_key(|t| t.origin);

        let mut mesh = MeshGl::new(num_prop);
        let mut record_index: HashMap<Vec<u32>, u32> = HashMap::new();
        let mut position_index: HashMap<[u32; 3], u32> = HashMap::new();

        for tri in &triangles {
            if mesh.run_original_id.last() != Some(&tri.origin) {
                mesh.run_index.push(mesh.tri_verts.len() as u32);
                mesh.run_original_id.push(tri.origin);
                let affine = self.origins.get(&tri.origin).copied().unwrap_or(DAffine3::IDENTITY);
                mesh.run_transform.extend_from_slice(&affine_to_columns(&affine));
            }
            for corner in &tri.corners {
                let mut record: Vec<f32> = Vec::with_capacity(num_prop);
                record.extend(corner.position.to_array().iter().map(|&c| c as f32));
                record.extend(corner.props.iter().map(|&p| p as f32));
                record.resize(num_prop, 0.0);
                let key: Vec<u32> = record.iter().map(|&f| canonical_bits(f)).collect();

                let next = (mesh.vert_properties.len() / num_prop) as u32;
                let index = *record_index.entry(key.clone()).or_insert_with(|| {
                    mesh.vert_properties.extend_from_slice(&record);
                    next
                });
                if index == next {
                    let position_key = [key[0], key[1], key[2]];
                    let first = *position_index.entry(position_key).or_insert(index);
                    if first != index {
                        mesh.merge_from_vert.push(index);
                        mesh.merge_to_vert.push(first);
                    }
                }
                mesh.tri_verts.push(index);
            }
        }
        if !mesh.run_original_id.is_empty() {
            mesh.run_index.push(mesh.tri_verts.len() as u32);
        }
        mesh
    }

    /// Topological and metric measurements of the welded surface.
    pub fn measure(&self) -> Measurements {
        let triangles = self.triangles();
        let mut positions: HashMap<[u64; 3], u32> = HashMap::new();
        let mut edges: HashSet<(u32, u32)> = HashSet::new();
        let mut volume = 0.0;
        let mut surface_area = 0.0;
        let mut bounds: Option<(DVec3, DVec3)> = None;

        for tri in &triangles {
            let [a, b, c] = [0, 1, 2].map(|k| tri.corners[k].position);
            volume += a.dot(b.cross(c)) / 6.0;
            surface_area += (b - a).cross(c - a).length() / 2.0;

            let ids = [a, b, c].map(|p| {
                let next = positions.len() as u32;
                *positions.entry(position_key(p)).or_insert(next)
            });
            for k in 0..3 {
                let (u, v) = (ids[k], ids[(k + 1) % 3]);
                edges.insert((u.min(v), u.max(v)));
            }
            for p in [a, b, c] {
                bounds = Some(match bounds {
                    Some((lo, hi)) => (lo.min(p), hi.max(p)),
                    None => (p, p),
                });
            }
        }

        let (v, e, f) = (positions.len(), edges.len(), triangles.len());
        let euler = v as i64 - e as i64 + f as i64;
        Measurements {
            num_vert: v,
            num_tri: f,
            num_edge: e,
            genus: if f == 0 { 0 } else { 1 - euler / 2 },
            volume,
            surface_area,
            bounds,
        }
    }

    /// Triangulates every polygon after welding nearly coincident corners
    /// and inserting vertices that other polygons place on its edges.
    fn triangles(&self) -> Vec<ExportTriangle> {
        let mut welder = Welder::default();
        let welded: Vec<Vec<BspVertex>> = self
            .polygons
            .iter()
            .map(|polygon| {
                let mut vertices = polygon.vertices().to_vec();
                for v in &mut vertices {
                    v.position = welder.weld(v.position);
                }
                vertices.dedup_by(|b, a| a.position == b.position);
                while vertices.len() > 1 && vertices.first().map(|v| v.position) == vertices.last().map(|v| v.position) {
                    vertices.pop();
                }
                vertices
            })
            .collect();
        let points = welder.into_points();

        let mut out = Vec::new();
        for (polygon, vertices) in self.polygons.iter().zip(&welded) {
            if vertices.len() < 3 {
                continue;
            }
            let repaired = insert_t_junctions(vertices, &points);
            let projected = project(
                &repaired.iter().map(|v| v.position).collect::<Vec<_>>(),
                polygon.plane().normal(),
            );
            for [i, j, k] in triangulate(&projected) {
                out.push(ExportTriangle {
                    origin: polygon.origin(),
                    corners: [repaired[i].clone(), repaired[j].clone(), repaired[k].clone()],
                });
            }
        }
        out
    }
}

// =============================================================================
// WELDING
// =============================================================================

/// Snaps positions closer than [`WELD_EPSILON`] to the first one seen.
#[derive(Debug, Default)]
struct Welder {
    points: Vec<DVec3>,
    exact: HashMap<[u64; 3], usize>,
    grid: HashMap<[i64; 3], Vec<usize>>,
}

impl Welder {
    fn cell(p: DVec3) -> [i64; 3] {
        (p / WELD_EPSILON).floor().to_array().map(|c| c as i64)
    }

    fn weld(&mut self, p: DVec3) -> DVec3 {
        if let Some(&index) = self.exact.get(&position_key(p)) {
            return self.points[index];
        }
        let [cx, cy, cz] = Self::cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.grid.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    if let Some(&index) = bucket
                        .iter()
                        .find(|&&i| self.points[i].distance(p) <= WELD_EPSILON)
                    {
                        self.exact.insert(position_key(p), index);
                        return self.points[index];
                    }
                }
            }
        }
        let index = self.points.len();
        self.points.push(p);
        self.exact.insert(position_key(p), index);
        self.grid.entry([cx, cy, cz]).or_default().push(index);
        p
    }

    fn into_points(self) -> Vec<DVec3> {
        self.points
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Bit pattern with `-0.0` folded into `0.0`.
fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Hash key of a position with `-0.0` folded into `0.0`.
fn position_key(p: DVec3) -> [u64; 3] {
    p.to_array().map(|c| if c == 0.0 { 0 } else { c.to_bits() })
}

/// Every directed edge must be matched by its reverse.
fn check_closed(mesh: &MeshGl) -> KernelResult<()> {
    let mut welded: HashMap<[u32; 3], u32> = HashMap::new();
    let ids: Vec<u32> = (0..mesh.num_vert())
        .map(|v| {
            let base = v * mesh.num_prop;
            let key = [0, 1, 2].map(|k| canonical_bits(mesh.vert_properties[base + k]));
            let next = welded.len() as u32;
            *welded.entry(key).or_insert(next)
        })
        .collect();

    let mut balance: HashMap<(u32, u32), i64> = HashMap::new();
    for tri in mesh.tri_verts.chunks_exact(3) {
        for k in 0..3 {
            let u = ids[tri[k] as usize];
            let v = ids[tri[(k + 1) % 3] as usize];
            if u == v {
                continue;
            }
            let (key, delta) = if u < v { ((u, v), 1) } else { ((v, u), -1) };
            *balance.entry(key).or_insert(0) += delta;
        }
    }
    match balance.iter().find(|(_, &count)| count != 0) {
        Some(((u, v), _)) => Err(KernelError::invalid_mesh(format!(
            "surface is not closed at edge ({u}, {v})"
        ))),
        None => Ok(()),
    }
}

/// Triangulates a convex polygon into corner triples.
fn triangulate_polygon(polygon: &Polygon) -> Vec<[BspVertex; 3]> {
    let vertices = polygon.vertices();
    let projected = project(
        &vertices.iter().map(|v| v.position).collect::<Vec<_>>(),
        polygon.plane().normal(),
    );
    triangulate(&projected)
        .into_iter()
        .map(|[i, j, k]| [vertices[i].clone(), vertices[j].clone(), vertices[k].clone()])
        .collect()
}

/// Splits a triangle into `n * n` triangles. Points on the triangle's
/// edges are computed direction-independently so neighbors agree exactly.
fn refine_triangle(a: &BspVertex, b: &BspVertex, c: &BspVertex, n: u32) -> Vec<[BspVertex; 3]> {
    let point = |i: u32, j: u32| -> BspVertex {
        if j == 0 {
            edge_point(a, b, i, n)
        } else if i == 0 {
            edge_point(a, c, j, n)
        } else if i + j == n {
            edge_point(b, c, j, n)
        } else {
            let (wb, wc) = (f64::from(i) / f64::from(n), f64::from(j) / f64::from(n));
            let wa = 1.0 - wb - wc;
            BspVertex {
                position: a.position * wa + b.position * wb + c.position * wc,
                props: a
                    .props
                    .iter()
                    .zip(&b.props)
                    .zip(&c.props)
                    .map(|((pa, pb), pc)| pa * wa + pb * wb + pc * wc)
                    .collect(),
            }
        }
    };

    let mut out = Vec::with_capacity((n * n) as usize);
    for i in 0..n {
        for j in 0..n - i {
            out.push([point(i, j), point(i + 1, j), point(i, j + 1)]);
            if i + j + 1 < n {
                out.push([point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)]);
            }
        }
    }
    out
}

/// Copies polygon vertices, inserting every point of `points` that
/// lies strictly inside one of its edges.
fn insert_t_junctions(vertices: &[BspVertex], points: &[DVec3]) -> Vec<BspVertex> {
    let n = vertices.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        out.push(a.clone());

        let edge = b.position - a.position;
        let length_sq = edge.length_squared();
        if length_sq <= KERNEL_EPSILON * KERNEL_EPSILON {
            continue;
        }
        let lo = a.position.min(b.position) - DVec3::splat(KERNEL_EPSILON);
        let hi = a.position.max(b.position) + DVec3::splat(KERNEL_EPSILON);

        let mut inserted: Vec<(f64, DVec3)> = points
            .iter()
            .filter(|p| p.cmpge(lo).all() && p.cmple(hi).all())
            .filter(|&&p| p != a.position && p != b.position)
            .filter_map(|&p| {
                let t = (p - a.position).dot(edge) / length_sq;
                let closest = a.position + edge * t;
                let inside = t > 0.0 && t < 1.0 && (p - closest).length() < KERNEL_EPSILON;
                inside.then_some((t, p))
            })
            .collect();
        inserted.sort_by(|x, y| x.0.total_cmp(&y.0));

        for (t, p) in inserted {
            let mut v = a.lerp(b, t);
            v.position = p;
            out.push(v);
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
