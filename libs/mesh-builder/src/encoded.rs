//! # Encoded Meshes
//!
//! Wire format shared by the builder, the CSG pool and the worker.
//!
//! A submesh is a flat position buffer, an optional index buffer and a list
//! of extra attribute buffers tagged by [`AttributeKind`]. A group of
//! submeshes may carry a [`MergeMap`] naming vertex pairs that are the same
//! geometric point, indexed over the concatenation of all submesh vertices.

use crate::error::{MeshError, MeshResult};
use serde::{Deserialize, Serialize};

/// Kind of an extra per-vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Normal,
    TexCoord,
    Tangent,
    Color,
}

impl AttributeKind {
    /// Floats per vertex.
    pub const fn components(self) -> usize {
        match self {
            AttributeKind::Normal => 3,
            AttributeKind::TexCoord => 2,
            AttributeKind::Tangent | AttributeKind::Color => 4,
        }
    }
}

/// Triangle indices stored at the narrowest width that fits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "width", content = "data", rename_all = "snake_case")]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Packs `indices` for a buffer of `vertex_count` vertices.
    ///
    /// Up to 256 vertices use `u8`, up to 65536 use `u16`, anything larger
    /// `u32`.
    pub fn from_indices(indices: &[u32], vertex_count: usize) -> MeshResult<Self> {
        let max = u32::MAX as usize;
        if vertex_count > max {
            return Err(MeshError::TooManyVertices {
                count: vertex_count,
                max,
            });
        }
        Ok(if vertex_count <= 1 << 8 {
            IndexBuffer::U8(indices.iter().map(|&i| i as u8).collect())
        } else if vertex_count <= 1 << 16 {
            IndexBuffer::U16(indices.iter().map(|&i| i as u16).collect())
        } else {
            IndexBuffer::U32(indices.to_vec())
        })
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(data) => data.len(),
            IndexBuffer::U16(data) => data.len(),
            IndexBuffer::U32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per index.
    pub fn width(&self) -> usize {
        match self {
            IndexBuffer::U8(_) => 1,
            IndexBuffer::U16(_) => 2,
            IndexBuffer::U32(_) => 4,
        }
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            IndexBuffer::U8(data) => data.get(position).map(|&i| u32::from(i)),
            IndexBuffer::U16(data) => data.get(position).map(|&i| u32::from(i)),
            IndexBuffer::U32(data) => data.get(position).copied(),
        }
    }

    /// Widens every index to `u32`.
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            IndexBuffer::U8(data) => data.iter().map(|&i| u32::from(i)).collect(),
            IndexBuffer::U16(data) => data.iter().map(|&i| u32::from(i)).collect(),
            IndexBuffer::U32(data) => data.clone(),
        }
    }
}

/// Vertex pairs asserted to be the same point.
///
/// Serialized as `[from, to]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Vec<u32>, Vec<u32>)", into = "(Vec<u32>, Vec<u32>)")]
pub struct MergeMap {
    pub from: Vec<u32>,
    pub to: Vec<u32>,
}

impl MergeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, from: u32, to: u32) {
        self.from.push(from);
        self.to.push(to);
    }

    pub fn len(&self) -> usize {
        self.from.len().min(self.to.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.from.iter().copied().zip(self.to.iter().copied())
    }

    /// Checks both vectors have equal length and stay below `vertex_count`.
    pub fn validate(&self, vertex_count: usize) -> MeshResult<()> {
        if self.from.len() != self.to.len() {
            return Err(MeshError::invalid_encoding(format!(
                "merge map has {} sources but {} targets",
                self.from.len(),
                self.to.len()
            )));
        }
        if let Some((from, to)) = self
            .pairs()
            .find(|&(from, to)| from as usize >= vertex_count || to as usize >= vertex_count)
        {
            return Err(MeshError::invalid_encoding(format!(
                "merge pair ({from}, {to}) out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }
}

impl From<(Vec<u32>, Vec<u32>)> for MergeMap {
    fn from((from, to): (Vec<u32>, Vec<u32>)) -> Self {
        Self { from, to }
    }
}

impl From<MergeMap> for (Vec<u32>, Vec<u32>) {
    fn from(map: MergeMap) -> Self {
        (map.from, map.to)
    }
}

/// One material's vertex and index buffers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSubmesh {
    /// `None` means every three consecutive vertices form a triangle.
    pub indices: Option<IndexBuffer>,
    /// `3 * vertex_count` floats.
    pub positions: Vec<f32>,
    pub extra_attributes: Vec<(AttributeKind, Vec<f32>)>,
    #[serde(rename = "materialID")]
    pub material_id: Option<u32>,
}

impl EncodedSubmesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Buffer of the first attribute of `kind`.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&[f32]> {
        self.extra_attributes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, data)| data.as_slice())
    }

    /// Triangle corner indices, synthesized when the submesh is not indexed.
    pub fn triangle_indices(&self) -> Vec<u32> {
        match &self.indices {
            Some(indices) => indices.to_u32_vec(),
            None => (0..self.vertex_count() as u32).collect(),
        }
    }

    /// Checks buffer lengths and index ranges.
    pub fn validate(&self) -> MeshResult<()> {
        if self.positions.len() % 3 != 0 {
            return Err(MeshError::invalid_encoding(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        let vertex_count = self.vertex_count();
        for (kind, data) in &self.extra_attributes {
            let expected = vertex_count * kind.components();
            if data.len() != expected {
                return Err(MeshError::invalid_encoding(format!(
                    "{kind:?} buffer has {} floats, expected {expected}",
                    data.len()
                )));
            }
        }
        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(MeshError::invalid_encoding(format!(
                        "index buffer length {} is not a multiple of 3",
                        indices.len()
                    )));
                }
                if let Some(index) = indices
                    .to_u32_vec()
                    .into_iter()
                    .find(|&i| i as usize >= vertex_count)
                {
                    return Err(MeshError::invalid_encoding(format!(
                        "index {index} out of range for {vertex_count} vertices"
                    )));
                }
            }
            None if vertex_count % 3 != 0 => {
                return Err(MeshError::invalid_encoding(format!(
                    "non-indexed submesh has {vertex_count} vertices"
                )));
            }
            None => {}
        }
        Ok(())
    }
}

/// Submeshes of one mesh plus the merge map tying them together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedMeshGroup {
    pub merge_map: Option<MergeMap>,
    pub submeshes: Vec<EncodedSubmesh>,
}

impl EncodedMeshGroup {
    /// Vertices across all submeshes; the index space of the merge map.
    pub fn total_vertex_count(&self) -> usize {
        self.submeshes.iter().map(EncodedSubmesh::vertex_count).sum()
    }

    pub fn total_triangle_count(&self) -> usize {
        self.submeshes.iter().map(EncodedSubmesh::triangle_count).sum()
    }

    /// Validates every submesh and the merge map.
    pub fn validate(&self) -> MeshResult<()> {
        for submesh in &self.submeshes {
            submesh.validate()?;
        }
        if let Some(merge_map) = &self.merge_map {
            merge_map.validate(self.total_vertex_count())?;
        }
        Ok(())
    }
}
