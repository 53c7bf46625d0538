//! Rebuilding a builder from its wire form.

use crate::builder::MeshBuilder;
use crate::encoded::{AttributeKind, EncodedMeshGroup, EncodedSubmesh};
use crate::error::MeshResult;
use crate::triangle::{Triangle, Vertex};
use config::constants::BuilderConfig;
use glam::{Vec2, Vec3, Vec4};

fn read_vertex(submesh: &EncodedSubmesh, index: usize) -> Vertex {
    let slice = |kind: AttributeKind| {
        let n = kind.components();
        submesh
            .attribute(kind)
            .map(|data| &data[index * n..(index + 1) * n])
    };
    Vertex {
        position: Vec3::from_slice(&submesh.positions[index * 3..]),
        normal: slice(AttributeKind::Normal).map_or(Vec3::ZERO, Vec3::from_slice),
        uv: slice(AttributeKind::TexCoord).map_or(Vec2::ZERO, Vec2::from_slice),
        tangent: slice(AttributeKind::Tangent).map_or(Vec4::ZERO, Vec4::from_slice),
    }
}

impl MeshBuilder {
    /// Rebuilds triangles from an encoded group and stitches them.
    ///
    /// Each triangle takes the material ID of its submesh. Color buffers
    /// have no slot in a vertex record and are dropped.
    ///
    /// ## Errors
    ///
    /// [`crate::MeshError::InvalidEncoding`] if the group fails validation.
    pub fn from_encoded(group: &EncodedMeshGroup) -> MeshResult<Self> {
        Self::from_encoded_with_config(group, BuilderConfig::default())
    }

    pub fn from_encoded_with_config(
        group: &EncodedMeshGroup,
        config: BuilderConfig,
    ) -> MeshResult<Self> {
        group.validate()?;
        let mut builder = MeshBuilder::with_config(config);
        for submesh in &group.submeshes {
            let indices = submesh.triangle_indices();
            for corners in indices.chunks_exact(3) {
                let mut triangle = Triangle::new([
                    read_vertex(submesh, corners[0] as usize),
                    read_vertex(submesh, corners[1] as usize),
                    read_vertex(submesh, corners[2] as usize),
                ]);
                triangle.set_material(submesh.material_id);
                builder.add_triangle(triangle);
            }
        }
        let connected = builder.auto_connect_all();
        log::debug!(
            "Decoded {} triangles, {} edges stitched",
            builder.triangle_count(),
            connected
        );
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoded::IndexBuffer;
    use crate::MeshError;

    #[test]
    fn test_decode_non_indexed() {
        let group = EncodedMeshGroup {
            merge_map: None,
            submeshes: vec![EncodedSubmesh {
                indices: None,
                positions: vec![
                    0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                    1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
                ],
                extra_attributes: vec![(AttributeKind::Color, vec![1.0; 24])],
                material_id: Some(5),
            }],
        };
        let builder = MeshBuilder::from_encoded(&group).unwrap();
        assert_eq!(builder.triangle_count(), 2);
        assert!(builder.is_connected());
        assert_eq!(builder.triangles()[1].material(), Some(5));
    }

    #[test]
    fn test_decode_rejects_bad_indices() {
        let group = EncodedMeshGroup {
            merge_map: None,
            submeshes: vec![EncodedSubmesh {
                indices: Some(IndexBuffer::U16(vec![0, 1, 9])),
                positions: vec![0.0; 9],
                extra_attributes: Vec::new(),
                material_id: None,
            }],
        };
        assert!(matches!(
            MeshBuilder::from_encoded(&group),
            Err(MeshError::InvalidEncoding { .. })
        ));
    }
}
