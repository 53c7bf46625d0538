use glam::Vec3;
use mesh_builder::{FinalizeHints, MeshBuilder, QuadCorners};
use std::collections::BTreeMap;

/// Unit cube from six subdivided patches, one material per axis.
fn cube() -> MeshBuilder {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let faces = [
        ([p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)], 0),
        ([p(1., 0., 0.), p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.)], 0),
        ([p(1., 0., 1.), p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.)], 1),
        ([p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)], 1),
        ([p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.), p(0., 1., 0.)], 2),
        ([p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)], 2),
    ];
    let mut builder = MeshBuilder::new();
    let mut patches = Vec::new();
    for (corners, material) in faces {
        patches.push(builder.add_subdiv_quad(&QuadCorners::new(corners), 2, Some(material)));
    }
    let all: Vec<_> = builder.ids().collect();
    for patch in &patches {
        builder.auto_connect_edges(&patch.border_edges(), &all).unwrap();
    }
    builder
}

#[test]
fn encode_decode_encode_is_stable() {
    let materials = BTreeMap::from([(0u32, "x"), (1, "y"), (2, "z")]);
    let first = cube()
        .finalize(&materials, FinalizeHints::default(), true)
        .unwrap()
        .into_encoded();
    assert_eq!(first.submeshes.len(), 3);
    assert!(first.validate().is_ok());

    let decoded = MeshBuilder::from_encoded(&first).unwrap();
    assert_eq!(decoded.triangle_count(), 48);
    assert!(decoded.is_connected());

    let second = decoded
        .finalize(&materials, FinalizeHints::default(), true)
        .unwrap()
        .into_encoded();
    assert_eq!(second, first);
}

#[test]
fn merge_map_joins_patch_corners() {
    let finalized = cube()
        .finalize::<()>(&BTreeMap::new(), FinalizeHints::positions_only(), true)
        .unwrap();
    // Without materials everything lands in one submesh, fully shared.
    assert_eq!(finalized.submeshes.len(), 1);
    assert_eq!(finalized.submeshes[0].submesh.vertex_count(), 26);
    assert!(finalized.merge_map.as_ref().unwrap().is_empty());
    assert_eq!(finalized.manifold.unwrap().positions.len(), 26 * 3);
}

#[test]
fn json_wire_roundtrip() {
    let group = cube()
        .finalize::<()>(&BTreeMap::new(), FinalizeHints::default(), true)
        .unwrap()
        .into_encoded();
    let json = serde_json::to_string(&group).unwrap();
    let back: mesh_builder::EncodedMeshGroup = serde_json::from_str(&json).unwrap();
    assert_eq!(back, group);
}
