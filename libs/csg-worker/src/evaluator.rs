//! # Stack-Machine Evaluator
//!
//! Reduces a job to one solid by walking its tree and keeping kernel
//! handles on an operand stack.
//!
//! | Node | Pops | Pushes |
//! |------|------|--------|
//! | mesh leaf, primitive | 0 | 1 |
//! | extrude, revolve | 0 | 1 |
//! | unary operation | 1 | 1 |
//! | boolean | 2 | 1 |
//! | batch boolean | N | 1 |
//! | final query | 1 | 0 |
//!
//! The walker visits right before left and lists last to first, so popping
//! yields operands in tree order. Every handle the evaluator creates is
//! freed when it is dropped, whether evaluation succeeded or not.

use config::constants::DEFAULT_CIRCULAR_SEGMENTS;
use csg_kernel::{CylinderParams, GeometryKernel, KernelError, Measurements, SolidId};
use csg_tree::{
    iterate_job, FinalQuery, Job, JobOutput, OpTreeVisitor, Operation, Primitive, QueryValue,
    UnaryOp,
};
use glam::{DAffine3, DMat3, DVec3};
use hashbrown::HashMap;
use mesh_builder::EncodedMeshGroup;

use crate::error::{EvalError, EvalResult};
use crate::interleave::{deinterlace, interleave};
use crate::layout::AttributeLayout;

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Evaluates `job` against `kernel`.
///
/// ## Returns
///
/// The resulting mesh, one submesh per input submesh or primitive that
/// still contributes triangles, or the value of the job's query.
///
/// ## Errors
///
/// Any [`EvalError`]; the kernel holds no handles from this job afterwards.
pub fn evaluate(kernel: &mut dyn GeometryKernel, job: &Job<EncodedMeshGroup>) -> EvalResult<JobOutput> {
    let layout = AttributeLayout::from_job(job);
    let mut evaluator = Evaluator::new(kernel, layout);
    iterate_job(job, &mut evaluator)?;
    evaluator.finish()
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Walker callbacks driving a [`GeometryKernel`].
pub struct Evaluator<'k> {
    kernel: &'k mut dyn GeometryKernel,
    layout: AttributeLayout,
    stack: Vec<SolidId>,
    /// Every handle created, for cleanup.
    allocated: Vec<SolidId>,
    /// Synthetic original ID -> material of the submesh it tags.
    materials: HashMap<u32, Option<u32>>,
    query: Option<QueryValue>,
}

impl<'k> Evaluator<'k> {
    pub fn new(kernel: &'k mut dyn GeometryKernel, layout: AttributeLayout) -> Self {
        Self {
            kernel,
            layout,
            stack: Vec::new(),
            allocated: Vec::new(),
            materials: HashMap::new(),
            query: None,
        }
    }

    /// Result of the walk: the query value, or the single solid left on
    /// the stack converted back to submeshes.
    ///
    /// ## Errors
    ///
    /// [`EvalError::LeftoverStack`] when the walk did not reduce to one
    /// solid.
    pub fn finish(&mut self) -> EvalResult<JobOutput> {
        if let Some(value) = self.query.take() {
            return Ok(JobOutput::Query(value));
        }
        let &[solid] = self.stack.as_slice() else {
            return Err(EvalError::LeftoverStack(self.stack.len()));
        };
        let mesh = self.kernel.export(solid)?;
        let group = deinterlace(&mesh, &self.layout, &self.materials)?;
        log::debug!(
            "Evaluated {} submeshes, {} triangles",
            group.submeshes.len(),
            group.total_triangle_count()
        );
        Ok(JobOutput::Mesh(group))
    }

    fn push(&mut self, solid: SolidId) {
        self.allocated.push(solid);
        self.stack.push(solid);
    }

    /// Pops `count` operands, returned in tree order.
    fn pop(&mut self, operation: &'static str, count: usize) -> EvalResult<Vec<SolidId>> {
        let available = self.stack.len();
        if available < count {
            return Err(EvalError::underflow(operation, count, available));
        }
        let mut operands = self.stack.split_off(available - count);
        operands.reverse();
        Ok(operands)
    }

    fn unary(&mut self, transform: &UnaryOp, solid: SolidId) -> EvalResult<SolidId> {
        let result = match transform {
            UnaryOp::Refine { n } => self.kernel.refine(solid, *n)?,
            // The fresh original ID is not in `materials`; the result reads as unassigned.
            UnaryOp::AsOriginal => self.kernel.as_original(solid)?,
            _ => {
                let affine = unary_affine(transform)?;
                self.kernel.transform(solid, &affine)?
            }
        };
        Ok(result)
    }
}

impl OpTreeVisitor<EncodedMeshGroup> for Evaluator<'_> {
    type Error = EvalError;

    fn mesh(&mut self, group: &EncodedMeshGroup) -> EvalResult<()> {
        group.validate()?;
        let first = self.kernel.reserve_ids(group.submeshes.len() as u32);
        for (k, submesh) in group.submeshes.iter().enumerate() {
            self.materials.insert(first + k as u32, submesh.material_id);
        }
        let mesh = interleave(group, &self.layout, first);
        let solid = self.kernel.import(&mesh, self.layout.normal_offset())?;
        self.push(solid);
        Ok(())
    }

    fn primitive(&mut self, primitive: &Primitive) -> EvalResult<()> {
        let solid = match *primitive {
            Primitive::Cube { size, center } => self.kernel.cube(DVec3::from_array(size), center)?,
            Primitive::Cylinder {
                height,
                radius_low,
                radius_high,
                circular_segments,
                center,
            } => self.kernel.cylinder(CylinderParams {
                height,
                radius_low,
                radius_high: radius_high.unwrap_or(radius_low),
                segments: circular_segments.unwrap_or(DEFAULT_CIRCULAR_SEGMENTS),
                center,
            })?,
            Primitive::Sphere {
                radius,
                circular_segments,
            } => self
                .kernel
                .sphere(radius, circular_segments.unwrap_or(DEFAULT_CIRCULAR_SEGMENTS))?,
            Primitive::Tetrahedron => self.kernel.tetrahedron()?,
        };
        self.push(solid);
        Ok(())
    }

    fn operation(&mut self, operation: &Operation<EncodedMeshGroup>) -> EvalResult<()> {
        let name = operation.name();
        let solid = match operation {
            Operation::Boolean { op, .. } => {
                let operands = self.pop(name, 2)?;
                self.kernel.boolean(*op, operands[0], operands[1])?
            }
            Operation::BatchBoolean { op, manifolds } => {
                let operands = self.pop(name, manifolds.len())?;
                self.kernel.batch_boolean(*op, &operands)?
            }
            Operation::Unary { transform, .. } => {
                let operands = self.pop(name, 1)?;
                self.unary(transform, operands[0])?
            }
            Operation::Extrude(extrusion) => self.kernel.extrude(extrusion)?,
            Operation::Revolve(revolution) => self.kernel.revolve(revolution)?,
        };
        self.push(solid);
        Ok(())
    }

    fn final_operation(&mut self, query: FinalQuery) -> EvalResult<()> {
        let operands = self.pop("query", 1)?;
        if !self.stack.is_empty() {
            return Err(EvalError::LeftoverStack(self.stack.len() + 1));
        }
        let measurements = self.kernel.measure(operands[0])?;
        self.query = Some(query_value(query, &measurements));
        Ok(())
    }
}

impl Drop for Evaluator<'_> {
    fn drop(&mut self) {
        for solid in self.allocated.drain(..) {
            if let Err(err) = self.kernel.free(solid) {
                log::warn!("Failed to free {solid}: {err}");
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Affine matrix of a transform-like unary operation.
///
/// ## Errors
///
/// [`KernelError::InvalidParameter`] for a zero mirror normal or an
/// operation that is not an affine transform.
pub fn unary_affine(transform: &UnaryOp) -> EvalResult<DAffine3> {
    Ok(match transform {
        UnaryOp::Translate { offset } => DAffine3::from_translation(DVec3::from_array(*offset)),
        UnaryOp::Rotate { degrees } => {
            let [x, y, z] = degrees.map(f64::to_radians);
            DAffine3::from_mat3(
                DMat3::from_rotation_z(z) * DMat3::from_rotation_y(y) * DMat3::from_rotation_x(x),
            )
        }
        UnaryOp::Scale { factor } => DAffine3::from_scale(DVec3::from_array(*factor)),
        UnaryOp::Mirror { normal } => {
            let n = DVec3::from_array(*normal)
                .try_normalize()
                .ok_or_else(|| KernelError::invalid_parameter("mirror normal must be non-zero"))?;
            let outer = DMat3::from_cols(n * n.x, n * n.y, n * n.z);
            DAffine3::from_mat3(DMat3::IDENTITY - outer * 2.0)
        }
        UnaryOp::Transform { matrix } => DAffine3::from_cols_array(matrix),
        UnaryOp::Refine { .. } | UnaryOp::AsOriginal => {
            return Err(KernelError::invalid_parameter("operation is not an affine transform").into())
        }
    })
}

/// Maps kernel measurements to the value `query` asks for. An empty
/// solid's bounding box is all zeros.
pub fn query_value(query: FinalQuery, m: &Measurements) -> QueryValue {
    match query {
        FinalQuery::IsEmpty => QueryValue::Bool {
            value: m.is_empty(),
        },
        FinalQuery::NumVert => QueryValue::Count {
            value: m.num_vert as u64,
        },
        FinalQuery::NumTri => QueryValue::Count {
            value: m.num_tri as u64,
        },
        FinalQuery::NumEdge => QueryValue::Count {
            value: m.num_edge as u64,
        },
        FinalQuery::BoundingBox => {
            let (min, max) = m.bounds.unwrap_or((DVec3::ZERO, DVec3::ZERO));
            QueryValue::BoundingBox {
                min: min.to_array(),
                max: max.to_array(),
            }
        }
        FinalQuery::Genus => QueryValue::Scalar {
            value: m.genus as f64,
        },
        FinalQuery::Volume => QueryValue::Scalar { value: m.volume },
        FinalQuery::SurfaceArea => QueryValue::Scalar {
            value: m.surface_area,
        },
        FinalQuery::Properties => QueryValue::Properties {
            volume: m.volume,
            surface_area: m.surface_area,
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use config::constants::BUILTIN_KERNEL_PATH;
    use csg_kernel::{BuiltinKernelFactory, KernelFactory};
    use csg_tree::{BooleanOp, OperationTree};

    type Tree = OperationTree<EncodedMeshGroup>;

    fn kernel() -> Box<dyn GeometryKernel> {
        BuiltinKernelFactory.create(BUILTIN_KERNEL_PATH).unwrap()
    }

    fn scalar(output: JobOutput) -> f64 {
        match output {
            JobOutput::Query(QueryValue::Scalar { value }) => value,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_difference_pops_left_then_right() {
        let mut k = kernel();
        // big - small != small - big
        let tree = Tree::difference(
            Tree::cube([2.0; 3], true),
            Tree::cube([1.0; 3], true),
        );
        let volume = scalar(evaluate(k.as_mut(), &tree.query(FinalQuery::Volume)).unwrap());
        assert!((volume - 7.0).abs() < 1e-9);
        assert_eq!(k.live_count(), 0);
    }

    #[test]
    fn test_batch_pops_in_list_order() {
        let mut k = kernel();
        let tree = Tree::batch(
            BooleanOp::Subtract,
            vec![
                Tree::cube([4.0; 3], true),
                Tree::cube([2.0; 3], true),
                Tree::cube([0.5; 3], false),
            ],
        );
        let volume = scalar(evaluate(k.as_mut(), &tree.query(FinalQuery::Volume)).unwrap());
        assert!((volume - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_bounding_box_is_zero() {
        let mut k = kernel();
        let tree = Tree::intersection(
            Tree::cube([1.0; 3], false),
            Tree::cube([1.0; 3], false).translate([5.0, 0.0, 0.0]),
        );
        let out = evaluate(k.as_mut(), &tree.query(FinalQuery::BoundingBox)).unwrap();
        assert_eq!(
            out,
            JobOutput::Query(QueryValue::BoundingBox {
                min: [0.0; 3],
                max: [0.0; 3]
            })
        );
    }

    #[test]
    fn test_failure_frees_handles() {
        let mut k = kernel();
        // The cube on the right is built before the left sphere fails.
        let tree = Tree::union(
            Tree::Primitive(Primitive::Sphere {
                radius: -1.0,
                circular_segments: None,
            }),
            Tree::cube([1.0; 3], false),
        );
        let err = evaluate(k.as_mut(), &Job::Tree(tree)).unwrap_err();
        assert!(matches!(err, EvalError::Kernel(KernelError::InvalidParameter { .. })));
        assert_eq!(k.live_count(), 0);
    }

    #[test]
    fn test_underflow_is_reported() {
        let mut k = kernel();
        let mut evaluator = Evaluator::new(k.as_mut(), AttributeLayout::default());
        let op = Operation::<EncodedMeshGroup>::Boolean {
            op: BooleanOp::Add,
            left: Box::new(Tree::cube([1.0; 3], false)),
            right: Box::new(Tree::cube([1.0; 3], false)),
        };
        assert_eq!(
            evaluator.operation(&op),
            Err(EvalError::underflow("boolean", 2, 0))
        );
        assert_eq!(evaluator.finish(), Err(EvalError::LeftoverStack(0)));
    }

    #[test]
    fn test_rotate_applies_x_then_y_then_z() {
        let affine = unary_affine(&UnaryOp::Rotate {
            degrees: [90.0, 0.0, 90.0],
        })
        .unwrap();
        // +Y -> +Z under X, then stays +Z under Z.
        let p = affine.transform_point3(DVec3::Y);
        assert!((p - DVec3::Z).length() < 1e-12);
        // +X stays under X, then -> +Y under Z.
        let q = affine.transform_point3(DVec3::X);
        assert!((q - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_mirror_reflects_across_plane() {
        let affine = unary_affine(&UnaryOp::Mirror {
            normal: [2.0, 0.0, 0.0],
        })
        .unwrap();
        assert_eq!(
            affine.transform_point3(DVec3::new(1.0, 2.0, 3.0)),
            DVec3::new(-1.0, 2.0, 3.0)
        );
        assert!(unary_affine(&UnaryOp::Mirror { normal: [0.0; 3] }).is_err());
    }

    #[test]
    fn test_genus_and_counts() {
        let mut k = kernel();
        let cube = || Tree::cube([1.0; 3], false);
        let genus = scalar(evaluate(k.as_mut(), &cube().query(FinalQuery::Genus)).unwrap());
        assert_eq!(genus, 0.0);
        let verts = evaluate(k.as_mut(), &cube().query(FinalQuery::NumVert)).unwrap();
        assert_eq!(verts, JobOutput::Query(QueryValue::Count { value: 8 }));
        let empty = evaluate(k.as_mut(), &cube().query(FinalQuery::IsEmpty)).unwrap();
        assert_eq!(empty, JobOutput::Query(QueryValue::Bool { value: false }));
    }
}
