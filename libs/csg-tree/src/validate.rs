//! Client-side checks run before a job crosses the worker boundary.

use crate::error::{ProtocolError, ProtocolResult};
use crate::tree::{Job, Operation};
use crate::walker::{iterate_job, OpTreeVisitor};
use mesh_builder::EncodedMeshGroup;

struct Validator {
    leaves: usize,
}

impl OpTreeVisitor<EncodedMeshGroup> for Validator {
    type Error = ProtocolError;

    fn mesh(&mut self, mesh: &EncodedMeshGroup) -> ProtocolResult<()> {
        let leaf = self.leaves;
        self.leaves += 1;
        mesh.validate()
            .map_err(|source| ProtocolError::InvalidLeaf { leaf, source })
    }

    fn operation(&mut self, operation: &Operation<EncodedMeshGroup>) -> ProtocolResult<()> {
        match operation {
            Operation::BatchBoolean { manifolds, .. } if manifolds.is_empty() => Err(
                ProtocolError::invalid_operation("batch boolean without operands"),
            ),
            Operation::Extrude(extrusion) if extrusion.cross_section.contours.is_empty() => Err(
                ProtocolError::invalid_operation("extrude of an empty cross-section"),
            ),
            Operation::Revolve(revolution) if revolution.cross_section.contours.is_empty() => Err(
                ProtocolError::invalid_operation("revolve of an empty cross-section"),
            ),
            _ => Ok(()),
        }
    }
}

/// Validates every mesh leaf and operation of `job`.
///
/// ## Returns
///
/// Number of mesh leaves.
pub fn validate_job(job: &Job<EncodedMeshGroup>) -> ProtocolResult<usize> {
    let mut validator = Validator { leaves: 0 };
    iterate_job(job, &mut validator)?;
    Ok(validator.leaves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{BooleanOp, OperationTree};
    use mesh_builder::EncodedSubmesh;

    fn leaf(positions: Vec<f32>) -> OperationTree<EncodedMeshGroup> {
        OperationTree::Mesh(EncodedMeshGroup {
            merge_map: None,
            submeshes: vec![EncodedSubmesh {
                positions,
                ..EncodedSubmesh::default()
            }],
        })
    }

    #[test]
    fn test_counts_valid_leaves() {
        let job = Job::Tree(OperationTree::union(leaf(vec![0.0; 9]), leaf(vec![1.0; 9])));
        assert_eq!(validate_job(&job), Ok(2));
    }

    #[test]
    fn test_reports_bad_leaf_in_visit_order() {
        // Right child is visited first, so it is leaf 0.
        let job = Job::Tree(OperationTree::union(leaf(vec![0.0; 9]), leaf(vec![0.0; 7])));
        assert!(matches!(
            validate_job(&job),
            Err(ProtocolError::InvalidLeaf { leaf: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_empty_batch() {
        let job = Job::Tree(OperationTree::<EncodedMeshGroup>::batch(BooleanOp::Add, Vec::new()));
        assert!(matches!(
            validate_job(&job),
            Err(ProtocolError::InvalidOperation { .. })
        ));
    }
}
