//! Finalization into per-material submeshes.

use super::MeshBuilder;
use crate::bit_array::BitArray;
use crate::encoded::{AttributeKind, EncodedMeshGroup, EncodedSubmesh, IndexBuffer, MergeMap};
use crate::error::MeshResult;
use crate::triangle::{self, Triangle, TriangleId};
use crate::vertex_hasher::VertexHasher;
use config::constants::{NORMAL_OFFSET, POSITION_OFFSET, TANGENT_OFFSET, UV_OFFSET};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Attributes to emit besides positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeHints {
    pub normals: bool,
    pub tex_coords: bool,
    pub tangents: bool,
}

impl Default for FinalizeHints {
    fn default() -> Self {
        Self {
            normals: true,
            tex_coords: true,
            tangents: true,
        }
    }
}

impl FinalizeHints {
    /// Positions only.
    pub fn positions_only() -> Self {
        Self {
            normals: false,
            tex_coords: false,
            tangents: false,
        }
    }

    /// Enabled attributes with their offset inside a vertex record.
    fn layout(&self) -> Vec<(AttributeKind, usize)> {
        [
            (self.normals, AttributeKind::Normal, NORMAL_OFFSET),
            (self.tex_coords, AttributeKind::TexCoord, UV_OFFSET),
            (self.tangents, AttributeKind::Tangent, TANGENT_OFFSET),
        ]
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(|(_, kind, offset)| (kind, offset))
        .collect()
    }
}

/// One global, fully shared position/index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifoldBuffers {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

/// A submesh and the material it was grouped under.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSubmesh<M> {
    pub material_id: Option<u32>,
    pub material: Option<M>,
    pub submesh: EncodedSubmesh,
}

/// Result of [`MeshBuilder::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedMesh<M> {
    /// Null material first, then ascending material ID.
    pub submeshes: Vec<FinalizedSubmesh<M>>,
    pub manifold: Option<ManifoldBuffers>,
    /// Submesh vertices that are the same manifold vertex, indexed over the
    /// concatenation of all submesh vertices.
    pub merge_map: Option<MergeMap>,
}

impl<M> FinalizedMesh<M> {
    /// Wire form, leaving the materials behind.
    pub fn to_encoded(&self) -> EncodedMeshGroup {
        EncodedMeshGroup {
            merge_map: self.merge_map.clone(),
            submeshes: self.submeshes.iter().map(|s| s.submesh.clone()).collect(),
        }
    }

    pub fn into_encoded(self) -> EncodedMeshGroup {
        EncodedMeshGroup {
            merge_map: self.merge_map,
            submeshes: self.submeshes.into_iter().map(|s| s.submesh).collect(),
        }
    }
}

/// Deduplicated buffers for one material group plus the submesh-local
/// vertex of every corner.
struct GroupBuffers {
    submesh: EncodedSubmesh,
    corners: Vec<u32>,
}

fn build_group(
    triangles: &[Triangle],
    ids: &[TriangleId],
    material_id: Option<u32>,
    layout: &[(AttributeKind, usize)],
) -> MeshResult<GroupBuffers> {
    let stride = 3 + layout.iter().map(|(k, _)| k.components()).sum::<usize>();
    let mut hasher = VertexHasher::with_capacity(stride, ids.len() * 3);
    let mut corners = Vec::with_capacity(ids.len() * 3);
    let mut record = vec![0.0f32; stride];

    for id in ids {
        let triangle = &triangles[id.index()];
        for corner in 0..3 {
            let source = triangle.record(corner);
            record[..3].copy_from_slice(&source[POSITION_OFFSET..POSITION_OFFSET + 3]);
            let mut cursor = 3;
            for &(kind, offset) in layout {
                let n = kind.components();
                record[cursor..cursor + n].copy_from_slice(&source[offset..offset + n]);
                cursor += n;
            }
            corners.push(hasher.get_or_insert(&record).0);
        }
    }

    let vertex_count = hasher.len();
    let records = hasher.into_records();
    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut extra_attributes: Vec<(AttributeKind, Vec<f32>)> = layout
        .iter()
        .map(|&(kind, _)| (kind, Vec::with_capacity(vertex_count * kind.components())))
        .collect();
    for vertex in records.chunks_exact(stride) {
        positions.extend_from_slice(&vertex[..3]);
        let mut cursor = 3;
        for (kind, data) in &mut extra_attributes {
            let n = kind.components();
            data.extend_from_slice(&vertex[cursor..cursor + n]);
            cursor += n;
        }
    }

    Ok(GroupBuffers {
        submesh: EncodedSubmesh {
            indices: Some(IndexBuffer::from_indices(&corners, vertex_count)?),
            positions,
            extra_attributes,
            material_id,
        },
        corners,
    })
}

impl MeshBuilder {
    /// Groups triangles by material into deduplicated submeshes.
    ///
    /// A triangle's material resolves to its ID when `materials` contains
    /// it and to the null material otherwise.
    ///
    /// ## Parameters
    ///
    /// - `materials`: material ID to caller material
    /// - `hints`: which extra attributes to emit
    /// - `generate_manifold`: also build one shared position/index buffer by
    ///   unifying corners through their vertex stars, and the merge map
    ///
    /// ## Errors
    ///
    /// [`crate::MeshError::Disconnected`] when `generate_manifold` is set and
    /// the mesh is not connected.
    pub fn finalize<M>(
        &self,
        materials: &BTreeMap<u32, M>,
        hints: FinalizeHints,
        generate_manifold: bool,
    ) -> MeshResult<FinalizedMesh<M>>
    where
        M: Clone + Sync,
    {
        if generate_manifold {
            self.check_connected()?;
        }

        let mut groups: BTreeMap<Option<u32>, Vec<TriangleId>> = BTreeMap::new();
        for id in self.ids() {
            let material = self.triangles[id.index()]
                .material()
                .filter(|m| materials.contains_key(m));
            groups.entry(material).or_default().push(id);
        }
        let groups: Vec<(Option<u32>, Vec<TriangleId>)> = groups.into_iter().collect();

        let layout = hints.layout();
        let built: Vec<GroupBuffers> = groups
            .par_iter()
            .map(|(material_id, ids)| build_group(&self.triangles, ids, *material_id, &layout))
            .collect::<MeshResult<_>>()?;

        let (manifold, merge_map) = if generate_manifold {
            let (manifold, corner_vertices) = self.manifold_buffers();
            let vertex_count = manifold.positions.len() / 3;
            let merge_map = merge_map(&groups, &built, &corner_vertices, vertex_count);
            (Some(manifold), Some(merge_map))
        } else {
            (None, None)
        };

        log::debug!(
            "Finalized {} triangles into {} submeshes ({} vertices, manifold: {})",
            self.triangles.len(),
            built.len(),
            built.iter().map(|b| b.submesh.vertex_count()).sum::<usize>(),
            manifold.as_ref().map_or(0, |m| m.positions.len() / 3),
        );

        let submeshes = built
            .into_iter()
            .map(|group| FinalizedSubmesh {
                material_id: group.submesh.material_id,
                material: group
                    .submesh
                    .material_id
                    .and_then(|id| materials.get(&id).cloned()),
                submesh: group.submesh,
            })
            .collect();

        Ok(FinalizedMesh {
            submeshes,
            manifold,
            merge_map,
        })
    }

    /// Shared vertex per corner, unified through vertex stars.
    ///
    /// Returns the buffers and the manifold vertex of corner `3 * t + v`.
    fn manifold_buffers(&self) -> (ManifoldBuffers, Vec<u32>) {
        const UNASSIGNED: u32 = u32::MAX;
        let mut corner_vertices = vec![UNASSIGNED; self.triangles.len() * 3];
        let mut positions = Vec::new();

        for id in self.ids() {
            for corner in 0..3u8 {
                let slot = id.index() * 3 + corner as usize;
                if corner_vertices[slot] != UNASSIGNED {
                    continue;
                }
                let vertex = (positions.len() / 3) as u32;
                let position = self.triangles[id.index()].position(corner as usize);
                positions.extend_from_slice(&position.to_array());
                for (other, other_corner) in triangle::vertex_star(&self.triangles, id, corner) {
                    let other_slot = other.index() * 3 + other_corner as usize;
                    if corner_vertices[other_slot] == UNASSIGNED {
                        corner_vertices[other_slot] = vertex;
                    }
                }
                corner_vertices[slot] = vertex;
            }
        }

        let manifold = ManifoldBuffers {
            positions,
            indices: corner_vertices.clone(),
        };
        (manifold, corner_vertices)
    }
}

/// Pairs every concatenated submesh vertex with the first submesh vertex
/// that landed on the same manifold vertex.
fn merge_map(
    groups: &[(Option<u32>, Vec<TriangleId>)],
    built: &[GroupBuffers],
    corner_vertices: &[u32],
    manifold_vertex_count: usize,
) -> MergeMap {
    let total: usize = built.iter().map(|b| b.submesh.vertex_count()).sum();
    let mut representative = vec![u32::MAX; manifold_vertex_count];
    let mut seen = BitArray::new(total);
    let mut map = MergeMap::new();

    let mut base = 0u32;
    for ((_, ids), group) in groups.iter().zip(built) {
        for (k, id) in ids.iter().enumerate() {
            for corner in 0..3 {
                let local = group.corners[k * 3 + corner];
                let global = base + local;
                let vertex = corner_vertices[id.index() * 3 + corner] as usize;
                let first = &mut representative[vertex];
                if *first == u32::MAX {
                    *first = global;
                } else if *first != global && seen.insert(global as usize) {
                    map.push(global, *first);
                }
            }
        }
        base += group.submesh.vertex_count() as u32;
    }
    map
}
