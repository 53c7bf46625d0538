//! # Worker Protocol
//!
//! Messages exchanged between the pool and its workers.
//!
//! Inside one process messages travel over channels and buffers move by
//! ownership. The JSON form mirrors the same shapes for logging and
//! cross-process transports.

use crate::error::ProtocolResult;
use crate::tree::{Job, QueryValue};
use mesh_builder::EncodedMeshGroup;
use serde::{Deserialize, Serialize};

/// Identifier the pool assigns to a dispatched job.
pub type JobId = u64;

/// Message sent to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    /// Load the geometry kernel from `library_path`.
    Initialize {
        #[serde(rename = "libraryPath")]
        library_path: String,
    },
    /// Release the kernel and exit.
    Terminate,
    /// Evaluate one job.
    Operation {
        #[serde(rename = "jobID")]
        job_id: JobId,
        operation: Job<EncodedMeshGroup>,
    },
}

/// Payload of a successful job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum JobOutput {
    Mesh(EncodedMeshGroup),
    Query(QueryValue),
}

/// Message sent by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerResponse {
    /// The worker thread is running.
    Created,
    /// The kernel loaded; jobs may be sent.
    Ready,
    /// The worker exited.
    Terminated,
    /// Initialization failed.
    Crash { error: String },
    /// Outcome of one job.
    Result {
        #[serde(rename = "jobID")]
        job_id: JobId,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<JobOutput>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl WorkerResponse {
    pub fn success(job_id: JobId, output: JobOutput) -> Self {
        WorkerResponse::Result {
            job_id,
            success: true,
            result: Some(output),
            error: None,
        }
    }

    pub fn failure(job_id: JobId, error: impl Into<String>) -> Self {
        WorkerResponse::Result {
            job_id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Splits a result message into its job and outcome.
///
/// Returns `None` for every other message kind.
pub fn into_outcome(response: WorkerResponse) -> Option<(JobId, Result<JobOutput, String>)> {
    match response {
        WorkerResponse::Result {
            job_id,
            success: true,
            result: Some(output),
            ..
        } => Some((job_id, Ok(output))),
        WorkerResponse::Result {
            job_id,
            success: true,
            result: None,
            ..
        } => Some((job_id, Err("successful result carried no payload".to_string()))),
        WorkerResponse::Result { job_id, error, .. } => Some((
            job_id,
            Err(error.unwrap_or_else(|| "unknown worker error".to_string())),
        )),
        _ => None,
    }
}

/// Encodes a message as JSON.
pub fn to_json<T: Serialize>(message: &T) -> ProtocolResult<String> {
    serde_json::to_string(message).map_err(|err| crate::ProtocolError::Encode {
        message: err.to_string(),
    })
}

/// Decodes a message from JSON; unknown tags are errors.
pub fn from_json<T: for<'de> Deserialize<'de>>(json: &str) -> ProtocolResult<T> {
    Ok(serde_json::from_str(json)?)
}
