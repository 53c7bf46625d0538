//! # CSG Tree
//!
//! CSG expression trees, the depth-first walker shared by client and
//! worker, and the worker wire protocol.
//!
//! ## Example
//!
//! ```rust
//! use csg_tree::{iterate_op_tree, OpTreeVisitor, OperationTree, Primitive};
//!
//! struct CountPrimitives(usize);
//!
//! impl OpTreeVisitor<()> for CountPrimitives {
//!     type Error = ();
//!     fn primitive(&mut self, _primitive: &Primitive) -> Result<(), ()> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let cube = OperationTree::<()>::cube([1.0, 1.0, 1.0], false);
//! let tree = OperationTree::union(cube.clone(), cube.translate([2.0, 0.0, 0.0]));
//! let mut counter = CountPrimitives(0);
//! iterate_op_tree(&tree, &mut counter).unwrap();
//! assert_eq!(counter.0, 2);
//! ```

pub mod error;
pub mod protocol;
pub mod tree;
pub mod validate;
pub mod walker;

pub use error::{ProtocolError, ProtocolResult};
pub use protocol::{from_json, into_outcome, to_json, JobId, JobOutput, WorkerRequest, WorkerResponse};
pub use tree::{
    BooleanOp, CrossSection, Extrusion, FinalOperation, FinalQuery, Job, Operation, OperationTree,
    Primitive, QueryValue, Revolution, UnaryOp,
};
pub use validate::validate_job;
pub use walker::{iterate_job, iterate_op_tree, OpTreeVisitor};
