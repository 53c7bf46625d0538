//! # CSG Worker
//!
//! Evaluates CSG jobs on a dedicated thread that owns one geometry kernel.
//!
//! ## Pipeline
//!
//! ```text
//! Job<EncodedMeshGroup> -> AttributeLayout -> Evaluator (walker + kernel) -> JobOutput
//! ```
//!
//! ## Example
//!
//! ```rust
//! use config::constants::BUILTIN_KERNEL_PATH;
//! use csg_kernel::{BuiltinKernelFactory, KernelFactory};
//! use csg_tree::{FinalQuery, JobOutput, OperationTree, QueryValue};
//! use csg_worker::evaluate;
//! use mesh_builder::EncodedMeshGroup;
//!
//! let mut kernel = BuiltinKernelFactory.create(BUILTIN_KERNEL_PATH).unwrap();
//! let job = OperationTree::<EncodedMeshGroup>::cube([1.0, 1.0, 1.0], false)
//!     .query(FinalQuery::NumTri);
//! let output = evaluate(kernel.as_mut(), &job).unwrap();
//! assert_eq!(output, JobOutput::Query(QueryValue::Count { value: 12 }));
//! ```

pub mod error;
pub mod evaluator;
pub mod interleave;
pub mod layout;
pub mod worker;

pub use error::{EvalError, EvalResult};
pub use evaluator::{evaluate, query_value, unary_affine, Evaluator};
pub use interleave::{deinterlace, interleave};
pub use layout::AttributeLayout;
pub use worker::{run_worker, WorkerEvent, WorkerHandle, WorkerId};
