//! # Pool Integration Tests
//!
//! End-to-end dispatch through real worker threads and the built-in kernel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use config::constants::{PoolConfig, BUILTIN_KERNEL_PATH};
use csg_kernel::{BuiltinKernelFactory, GeometryKernel, KernelError, KernelFactory, KernelResult};
use csg_pool::{CsgPool, PoolError};
use csg_tree::{FinalQuery, Job, JobOutput, OperationTree, Primitive, QueryValue};
use glam::Vec3;
use mesh_builder::{EncodedMeshGroup, FinalizeHints, MeshBuilder, MeshError, QuadCorners};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pool(workers: usize) -> CsgPool {
    init_logging();
    CsgPool::new(PoolConfig::new(workers, BUILTIN_KERNEL_PATH).unwrap())
}

/// Unit cube at `offset`, every face tagged `material`.
fn cube(material: u32, offset: Vec3) -> MeshBuilder {
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z) + offset;
    let faces = [
        [p(0., 0., 1.), p(1., 0., 1.), p(1., 1., 1.), p(0., 1., 1.)],
        [p(1., 0., 0.), p(0., 0., 0.), p(0., 1., 0.), p(1., 1., 0.)],
        [p(1., 0., 1.), p(1., 0., 0.), p(1., 1., 0.), p(1., 1., 1.)],
        [p(0., 0., 0.), p(0., 0., 1.), p(0., 1., 1.), p(0., 1., 0.)],
        [p(0., 1., 1.), p(1., 1., 1.), p(1., 1., 0.), p(0., 1., 0.)],
        [p(0., 0., 0.), p(1., 0., 0.), p(1., 0., 1.), p(0., 0., 1.)],
    ];
    let mut builder = MeshBuilder::new();
    let patches: Vec<_> = faces
        .iter()
        .map(|corners| builder.add_subdiv_quad(&QuadCorners::new(*corners), 1, Some(material)))
        .collect();
    let all: Vec<_> = builder.ids().collect();
    for patch in &patches {
        builder.auto_connect_edges(&patch.border_edges(), &all).unwrap();
    }
    builder
}

fn mesh(output: JobOutput) -> EncodedMeshGroup {
    match output {
        JobOutput::Mesh(group) => group,
        other => panic!("expected mesh, got {other:?}"),
    }
}

#[tokio::test]
async fn disjoint_union_maps_materials_back() {
    let pool = pool(2);
    let materials = BTreeMap::from([(0u32, "red"), (1, "green")]);
    let tree = OperationTree::union(
        OperationTree::Mesh(cube(0, Vec3::ZERO)),
        OperationTree::Mesh(cube(1, Vec3::new(3.0, 0.0, 0.0))),
    );
    let output = pool
        .dispatch_builders(Job::Tree(tree), &materials, FinalizeHints::default())
        .await
        .unwrap();
    let group = mesh(output);

    assert!(group.validate().is_ok());
    assert_eq!(group.submeshes.len(), 2);
    assert_eq!(group.total_triangle_count(), 24);
    for submesh in &group.submeshes {
        let name = materials[&submesh.material_id.unwrap()];
        let xs = submesh.positions.chunks_exact(3).map(|p| p[0]);
        match name {
            "red" => assert!(xs.into_iter().all(|x| (0.0..=1.0).contains(&x))),
            "green" => assert!(xs.into_iter().all(|x| (3.0..=4.0).contains(&x))),
            other => panic!("unexpected material {other}"),
        }
    }
    pool.dispose().await.unwrap();
}

#[tokio::test]
async fn jobs_spread_across_workers() {
    let pool = pool(2);
    pool.initialize().await.unwrap();
    assert_eq!(pool.worker_count().await.unwrap(), 2);

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let pool = pool.clone();
            let size = f64::from(i);
            tokio::spawn(async move {
                pool.dispatch(OperationTree::cube([size; 3], true).query(FinalQuery::Volume))
                    .await
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let size = (i + 1) as f64;
        match handle.await.unwrap().unwrap() {
            JobOutput::Query(QueryValue::Scalar { value }) => {
                assert_relative_eq!(value, size * size * size, epsilon = 1e-9)
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(pool.job_counts().await.unwrap(), vec![2, 2]);
}

#[tokio::test]
async fn failed_job_leaves_pool_usable() {
    let pool = pool(1);
    let bad = OperationTree::<EncodedMeshGroup>::Primitive(Primitive::Sphere {
        radius: -1.0,
        circular_segments: None,
    });
    match pool.dispatch(Job::Tree(bad)).await {
        Err(PoolError::JobFailed(message)) => assert!(message.contains("radius")),
        other => panic!("unexpected {other:?}"),
    }
    let ok = pool
        .dispatch(OperationTree::cube([1.0; 3], false).query(FinalQuery::IsEmpty))
        .await
        .unwrap();
    assert_eq!(ok, JobOutput::Query(QueryValue::Bool { value: false }));
}

#[tokio::test]
async fn invalid_leaves_fail_before_dispatch() {
    let pool = pool(1);

    let mut group = mesh(
        pool.dispatch_builders::<()>(
            Job::Tree(OperationTree::Mesh(cube(0, Vec3::ZERO))),
            &BTreeMap::new(),
            FinalizeHints::positions_only(),
        )
        .await
        .unwrap(),
    );
    group.submeshes[0].positions.truncate(4);
    assert!(matches!(
        pool.dispatch(Job::Tree(OperationTree::Mesh(group))).await,
        Err(PoolError::Protocol(_))
    ));

    let mut open = cube(0, Vec3::ZERO);
    open.add_subdiv_quad(
        &QuadCorners::new([Vec3::splat(5.0), Vec3::new(6.0, 5.0, 5.0), Vec3::splat(6.0), Vec3::new(5.0, 6.0, 6.0)]),
        1,
        None,
    );
    assert!(matches!(
        pool.dispatch_builders::<()>(
            Job::Tree(OperationTree::Mesh(open)),
            &BTreeMap::new(),
            FinalizeHints::default()
        )
        .await,
        Err(PoolError::Mesh(MeshError::Disconnected { .. }))
    ));
    assert_eq!(pool.job_counts().await.unwrap(), vec![1]);
}

#[tokio::test]
async fn dispose_is_permanent() {
    let pool = pool(2);
    pool.initialize().await.unwrap();
    pool.dispose().await.unwrap();
    assert_eq!(
        pool.dispatch(OperationTree::cube([1.0; 3], false).query(FinalQuery::NumTri))
            .await,
        Err(PoolError::Disposed)
    );
    assert_eq!(pool.initialize().await, Err(PoolError::Disposed));
}

#[tokio::test]
async fn unknown_library_fails_initialization() {
    init_logging();
    let pool = CsgPool::new(PoolConfig::new(2, "kernel.wasm").unwrap());
    assert!(matches!(pool.initialize().await, Err(PoolError::InitFailed(_))));
    assert!(matches!(
        pool.dispatch(OperationTree::cube([1.0; 3], false).query(FinalQuery::NumTri))
            .await,
        Err(PoolError::InitFailed(_))
    ));
}

/// Fails the first kernel it is asked for.
#[derive(Default)]
struct FlakyFactory {
    calls: AtomicUsize,
}

impl KernelFactory for FlakyFactory {
    fn create(&self, library_path: &str) -> KernelResult<Box<dyn GeometryKernel>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(KernelError::UnsupportedLibrary {
                path: "flaky".to_string(),
            });
        }
        BuiltinKernelFactory.create(library_path)
    }
}

#[tokio::test]
async fn partial_start_failure_is_tolerated() {
    init_logging();
    let pool = CsgPool::with_factory(
        PoolConfig::new(3, BUILTIN_KERNEL_PATH).unwrap(),
        Arc::new(FlakyFactory::default()),
    );
    pool.initialize().await.unwrap();
    assert_eq!(pool.worker_count().await.unwrap(), 2);
    let output = pool
        .dispatch(OperationTree::cube([1.0; 3], false).query(FinalQuery::NumEdge))
        .await
        .unwrap();
    assert_eq!(output, JobOutput::Query(QueryValue::Count { value: 18 }));
}
