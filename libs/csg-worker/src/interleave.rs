//! # Buffer Interleaving
//!
//! Conversion between the per-submesh wire buffers and the kernel's single
//! interleaved [`MeshGl`].
//!
//! ## Import
//!
//! Every submesh becomes one run tagged with a synthetic original ID, so
//! the triangles it contributes can be traced back after booleans.
//!
//! ## Export
//!
//! Each run of the result becomes one submesh with a compact local index
//! buffer. Vertices the kernel shares between runs, or names in its merge
//! vectors, are tied together again through the group's merge map.

use csg_kernel::MeshGl;
use glam::{DMat3, DVec3};
use hashbrown::HashMap;
use mesh_builder::{AttributeKind, EncodedMeshGroup, EncodedSubmesh, IndexBuffer, MergeMap};

use crate::error::EvalResult;
use crate::layout::AttributeLayout;

// =============================================================================
// IMPORT
// =============================================================================

/// Packs `group` into one mesh laid out by `layout`, run `k` tagged
/// `first_id + k`.
///
/// `group` must already be validated.
pub fn interleave(group: &EncodedMeshGroup, layout: &AttributeLayout, first_id: u32) -> MeshGl {
    let num_prop = layout.num_prop();
    let mut mesh = MeshGl::new(num_prop);
    let mut base = 0u32;

    for (k, submesh) in group.submeshes.iter().enumerate() {
        mesh.run_index.push(mesh.tri_verts.len() as u32);
        mesh.run_original_id.push(first_id + k as u32);

        let vertex_count = submesh.vertex_count();
        let start = mesh.vert_properties.len();
        mesh.vert_properties.resize(start + vertex_count * num_prop, 0.0);
        let records = &mut mesh.vert_properties[start..];

        for (record, position) in records
            .chunks_exact_mut(num_prop)
            .zip(submesh.positions.chunks_exact(3))
        {
            record[..3].copy_from_slice(position);
        }
        for (kind, data) in &submesh.extra_attributes {
            let Some(offset) = layout.offset(*kind) else {
                continue;
            };
            let width = kind.components();
            for (record, value) in records.chunks_exact_mut(num_prop).zip(data.chunks_exact(width)) {
                record[offset..offset + width].copy_from_slice(value);
            }
        }

        mesh.tri_verts
            .extend(submesh.triangle_indices().into_iter().map(|i| i + base));
        base += vertex_count as u32;
    }
    if !group.submeshes.is_empty() {
        mesh.run_index.push(mesh.tri_verts.len() as u32);
    }

    if let Some(merge_map) = &group.merge_map {
        for (from, to) in merge_map.pairs() {
            mesh.merge_from_vert.push(from);
            mesh.merge_to_vert.push(to);
        }
    }
    mesh
}

// =============================================================================
// EXPORT
// =============================================================================

/// Splits `mesh` into one submesh per run.
///
/// `materials` maps synthetic IDs to the material of the submesh they were
/// reserved for; runs from primitives have no entry and get no material.
///
/// ## Errors
///
/// Propagates index packing failures as malformed output.
pub fn deinterlace(
    mesh: &MeshGl,
    layout: &AttributeLayout,
    materials: &HashMap<u32, Option<u32>>,
) -> EvalResult<EncodedMeshGroup> {
    let num_prop = mesh.num_prop;
    let mut submeshes = Vec::with_capacity(mesh.num_runs());
    // Kernel vertex -> every output vertex copied from it.
    let mut copies: HashMap<u32, Vec<u32>> = HashMap::new();
    let mut merge_map = MergeMap::new();
    let mut base = 0u32;

    for run in 0..mesh.num_runs() {
        let (start, end) = mesh.run_triangles(run);
        let mut local: HashMap<u32, u32> = HashMap::new();
        let mut order: Vec<u32> = Vec::new();
        let indices: Vec<u32> = mesh.tri_verts[start * 3..end * 3]
            .iter()
            .map(|&v| {
                let next = order.len() as u32;
                *local.entry(v).or_insert_with(|| {
                    order.push(v);
                    next
                })
            })
            .collect();

        let tangent_matrix = layout
            .offset(AttributeKind::Tangent)
            .and_then(|_| run_matrix(mesh, run));

        let mut positions = Vec::with_capacity(order.len() * 3);
        let mut extra_attributes: Vec<(AttributeKind, Vec<f32>)> = layout
            .columns()
            .iter()
            .map(|&(kind, _)| (kind, Vec::with_capacity(order.len() * kind.components())))
            .collect();

        for &v in &order {
            let v = v as usize;
            let record = &mesh.vert_properties[v * num_prop..(v + 1) * num_prop];
            positions.extend_from_slice(&record[..3]);
            for ((kind, data), &(_, offset)) in extra_attributes.iter_mut().zip(layout.columns()) {
                let value = &record[offset..offset + kind.components()];
                match (*kind, tangent_matrix) {
                    (AttributeKind::Tangent, Some(matrix)) => {
                        data.extend(transform_tangent(&matrix, value))
                    }
                    _ => data.extend_from_slice(value),
                }
            }
        }

        for (i, &v) in order.iter().enumerate() {
            let out = base + i as u32;
            let seen = copies.entry(v).or_default();
            if let Some(&first) = seen.first() {
                merge_map.push(out, first);
            }
            seen.push(out);
        }

        let vertex_count = order.len();
        submeshes.push(EncodedSubmesh {
            indices: Some(IndexBuffer::from_indices(&indices, vertex_count)?),
            positions,
            extra_attributes,
            material_id: materials
                .get(&mesh.run_original_id[run])
                .copied()
                .flatten(),
        });
        base += vertex_count as u32;
    }

    for (from, to) in mesh.merge_from_vert.iter().zip(&mesh.merge_to_vert) {
        let (Some(sources), Some(&target)) = (
            copies.get(from),
            copies.get(to).and_then(|outs| outs.first()),
        ) else {
            continue;
        };
        for &out in sources {
            merge_map.push(out, target);
        }
    }

    Ok(EncodedMeshGroup {
        merge_map: (!merge_map.is_empty()).then_some(merge_map),
        submeshes,
    })
}

/// Linear part of run `run`'s transform, `None` when exactly identity.
fn run_matrix(mesh: &MeshGl, run: usize) -> Option<DMat3> {
    let matrix = mesh.run_affine(run).matrix3;
    (matrix != DMat3::IDENTITY).then_some(matrix)
}

/// Applies `matrix` to a tangent's direction. The handedness sign flips
/// with mirroring transforms.
fn transform_tangent(matrix: &DMat3, tangent: &[f32]) -> [f32; 4] {
    let direction = (*matrix
        * DVec3::new(
            f64::from(tangent[0]),
            f64::from(tangent[1]),
            f64::from(tangent[2]),
        ))
    .normalize_or_zero();
    let sign = if matrix.determinant() < 0.0 {
        -tangent[3]
    } else {
        tangent[3]
    };
    [direction.x as f32, direction.y as f32, direction.z as f32, sign]
}

// =============================================================================
// TESTS
// =============================================================================
