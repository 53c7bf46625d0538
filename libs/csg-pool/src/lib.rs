//! # CSG Pool
//!
//! Dispatches CSG jobs to a pool of worker threads, each owning its own
//! geometry kernel.
//!
//! ## Example
//!
//! ```rust
//! use config::constants::PoolConfig;
//! use csg_pool::CsgPool;
//! use csg_tree::{FinalQuery, JobOutput, OperationTree, QueryValue};
//! use mesh_builder::EncodedMeshGroup;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pool = CsgPool::new(PoolConfig::default());
//! let cube = OperationTree::<EncodedMeshGroup>::cube([1.0, 1.0, 1.0], false);
//! let output = pool.dispatch(cube.query(FinalQuery::NumVert)).await.unwrap();
//! assert_eq!(output, JobOutput::Query(QueryValue::Count { value: 8 }));
//! pool.dispose().await.unwrap();
//! # }
//! ```

pub mod error;
pub mod pool;

pub use error::{PoolError, PoolResult};
pub use pool::{encode_job, CsgPool, PoolStats};
