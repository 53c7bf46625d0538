use glam::Vec3;
use mesh_builder::{
    EdgeLink, FinalizeHints, MeshBuilder, QuadCorners, Triangle, TriangleId,
};
use std::collections::{BTreeMap, HashSet};

/// Closed octahedron, outward winding, stitched.
fn octahedron() -> MeshBuilder {
    let mut builder = MeshBuilder::new();
    for sx in [1.0f32, -1.0] {
        for sy in [1.0f32, -1.0] {
            for sz in [1.0f32, -1.0] {
                let (x, y, z) = (Vec3::X * sx, Vec3::Y * sy, Vec3::Z * sz);
                let positions = if sx * sy * sz > 0.0 { [x, y, z] } else { [x, z, y] };
                builder.add_triangle(Triangle::from_positions(positions));
            }
        }
    }
    builder.auto_connect_all();
    builder
}

fn sphere(levels: usize) -> MeshBuilder {
    let mut builder = octahedron();
    for _ in 0..levels {
        builder.sub_divide4();
    }
    builder.project_to_unit_sphere();
    builder
}

#[test]
fn shared_edge_connects_only_with_reversed_winding() {
    let mut builder = MeshBuilder::new();
    let a = builder.add_triangle(Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]));
    let b = builder.add_triangle(Triangle::from_positions([
        Vec3::X,
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::Y,
    ]));
    assert_eq!(builder.auto_connect_all_edges(&[a, b]), 1);
    assert!(builder.is_connected());

    let mut flipped = MeshBuilder::new();
    let a = flipped.add_triangle(Triangle::from_positions([Vec3::ZERO, Vec3::X, Vec3::Y]));
    let b = flipped.add_triangle(Triangle::from_positions([
        Vec3::X,
        Vec3::Y,
        Vec3::new(1.0, 1.0, 0.0),
    ]));
    assert_eq!(flipped.auto_connect_all_edges(&[a, b]), 0);
    assert!(!flipped.is_connected());
}

#[test]
fn subdivided_quad_keeps_border_normals() {
    let mut builder = MeshBuilder::new();
    builder.add_subdiv_quad(
        &QuadCorners::new([
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ]),
        1,
        None,
    );
    assert_eq!(builder.triangle_count(), 2);
    builder.sub_divide4();
    assert_eq!(builder.triangle_count(), 8);
    assert!(builder.is_connected());
    for triangle in builder.triangles() {
        for i in 0..3 {
            assert_eq!(triangle.normal(i), Vec3::Z);
        }
    }
}

#[test]
fn connect_and_disconnect_are_symmetric() {
    let mut builder = octahedron();
    let a = TriangleId(0);
    let old = builder.connected_edge(a, 0).unwrap().unwrap();

    builder.disconnect_edge(a, 0).unwrap();
    assert_eq!(builder.connected_edge(a, 0).unwrap(), None);
    assert_eq!(builder.connected_edge(old.triangle, old.edge).unwrap(), None);
    builder.disconnect_edge(a, 0).unwrap();

    builder.connect_edge(a, 0, old.triangle, old.edge).unwrap();
    assert_eq!(
        builder.connected_edge(old.triangle, old.edge).unwrap(),
        Some(EdgeLink::new(a, 0))
    );

    // Relinking edge 0 elsewhere clears both historical neighbours.
    let other = builder.connected_edge(a, 1).unwrap().unwrap();
    builder.connect_edge(a, 0, other.triangle, other.edge).unwrap();
    assert_eq!(builder.connected_edge(old.triangle, old.edge).unwrap(), None);
    assert_eq!(builder.connected_edge(a, 1).unwrap(), None);
    assert_eq!(
        builder.connected_edge(other.triangle, other.edge).unwrap(),
        Some(EdgeLink::new(a, 0))
    );
}

#[test]
fn vertex_star_on_closed_mesh_has_no_duplicates() {
    let builder = sphere(2);
    assert!(builder.triangles().iter().all(Triangle::is_closed));
    for id in builder.ids() {
        for corner in 0..3 {
            let star = builder.vertex_star(id, corner).unwrap();
            let unique: HashSet<_> = star.iter().collect();
            assert_eq!(unique.len(), star.len());
            assert!(star.len() == 4 || star.len() == 6, "star of {}", star.len());
            let position = builder.triangle(id).unwrap().position(corner as usize);
            for (other, other_corner) in star {
                let shared = builder.triangle(other).unwrap().position(other_corner as usize);
                assert!((shared - position).length() < 1e-6);
            }
        }
    }
}

#[test]
fn subdivision_quadruples_and_stays_connected() {
    let mut builder = octahedron();
    assert!(builder.is_connected());
    for level in 1..=3 {
        builder.sub_divide4();
        assert_eq!(builder.triangle_count(), 8 * 4usize.pow(level));
        assert!(builder.is_connected());
    }
}

#[test]
fn finalize_two_materials_in_ascending_order() {
    let mut builder = sphere(3);
    builder.make_equirect_uvs();
    builder.add_smooth_normals(std::f32::consts::PI, true, false);
    let half = builder.triangle_count() / 2;
    for (k, id) in builder.ids().collect::<Vec<_>>().into_iter().enumerate() {
        let material = if k < half { 9 } else { 2 };
        builder.set_material(id, Some(material)).unwrap();
    }
    let materials = BTreeMap::from([(2u32, "red"), (9u32, "blue")]);

    let finalized = builder
        .finalize(&materials, FinalizeHints::default(), true)
        .unwrap();
    assert_eq!(finalized.submeshes.len(), 2);
    assert_eq!(finalized.submeshes[0].material_id, Some(2));
    assert_eq!(finalized.submeshes[1].material_id, Some(9));
    for submesh in &finalized.submeshes {
        let vertices = submesh.submesh.vertex_count();
        let width = submesh.submesh.indices.as_ref().unwrap().width();
        let expected = if vertices <= 256 { 1 } else if vertices <= 65536 { 2 } else { 4 };
        assert_eq!(width, expected);
    }
    let manifold = finalized.manifold.unwrap();
    // Euler: V - E + F = 2 on a sphere.
    let faces = manifold.indices.len() / 3;
    assert_eq!(manifold.positions.len() / 3, faces / 2 + 2);
}

#[test]
fn finalize_is_deterministic() {
    let build = || {
        let mut builder = sphere(2);
        builder.make_equirect_uvs();
        builder.add_smooth_normals(0.5, true, true);
        builder.set_material(TriangleId(3), Some(1)).unwrap();
        builder
            .finalize(&BTreeMap::from([(1u32, ())]), FinalizeHints::default(), true)
            .unwrap()
    };
    let a = build();
    let b = build();
    assert_eq!(a, b);
    let bytes = |f: &mesh_builder::FinalizedMesh<()>| serde_json::to_vec(&f.to_encoded()).unwrap();
    assert_eq!(bytes(&a), bytes(&b));
}
