//! # Worker Thread
//!
//! A worker is an OS thread owning one kernel instance and serving one
//! request at a time from its channel:
//!
//! 1. Reports `Created` once running
//! 2. `Initialize` loads the kernel and answers `Ready`, or `Crash` and exits
//! 3. `Operation` evaluates a job and answers `Result`
//! 4. `Terminate`, or the request channel closing, drops the kernel and exits
//!
//! `Terminated` is always the last event of a worker, even when the thread
//! unwinds from a panic outside job evaluation.

use std::any::Any;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use csg_kernel::{GeometryKernel, KernelFactory};
use csg_tree::{JobId, WorkerRequest, WorkerResponse};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::EvalError;
use crate::evaluator::evaluate;

/// Identifier of a worker, unique within a pool.
pub type WorkerId = u64;

/// A response tagged with the worker that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerEvent {
    pub worker: WorkerId,
    pub response: WorkerResponse,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Owning side of a worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    id: WorkerId,
    requests: UnboundedSender<WorkerRequest>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Starts a worker whose responses go to `events`.
    ///
    /// ## Errors
    ///
    /// Returns the OS error when the thread cannot be spawned.
    pub fn spawn(
        id: WorkerId,
        factory: Arc<dyn KernelFactory>,
        events: UnboundedSender<WorkerEvent>,
    ) -> io::Result<Self> {
        let (requests, inbox) = mpsc::unbounded_channel();
        let thread = thread::Builder::new()
            .name(format!("csg-worker-{id}"))
            .spawn(move || run_worker(id, factory.as_ref(), inbox, events))?;
        Ok(Self {
            id,
            requests,
            thread,
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Queues `request`; `false` when the worker has already exited.
    pub fn send(&self, request: WorkerRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    /// Closes the request channel and waits for the thread to exit.
    pub fn join(self) -> thread::Result<()> {
        drop(self.requests);
        self.thread.join()
    }
}

// =============================================================================
// LOOP
// =============================================================================

/// Sends `Terminated` when dropped.
struct TerminationGuard {
    id: WorkerId,
    events: UnboundedSender<WorkerEvent>,
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        log::debug!("Worker {} terminated", self.id);
        let _ = self.events.send(WorkerEvent {
            worker: self.id,
            response: WorkerResponse::Terminated,
        });
    }
}

/// Body of a worker thread.
pub fn run_worker(
    id: WorkerId,
    factory: &dyn KernelFactory,
    mut inbox: UnboundedReceiver<WorkerRequest>,
    events: UnboundedSender<WorkerEvent>,
) {
    let guard = TerminationGuard {
        id,
        events: events.clone(),
    };
    let send = |response: WorkerResponse| {
        // The pool may already be gone; nothing is waiting then.
        let _ = events.send(WorkerEvent {
            worker: id,
            response,
        });
    };
    send(WorkerResponse::Created);
    log::debug!("Worker {id} created");

    let mut kernel: Option<Box<dyn GeometryKernel>> = None;
    while let Some(request) = inbox.blocking_recv() {
        match request {
            WorkerRequest::Initialize { library_path } => match factory.create(&library_path) {
                Ok(loaded) => {
                    kernel = Some(loaded);
                    log::info!("Worker {id} ready ({library_path})");
                    send(WorkerResponse::Ready);
                }
                Err(err) => {
                    log::error!("Worker {id} failed to load {library_path}: {err}");
                    send(WorkerResponse::Crash {
                        error: err.to_string(),
                    });
                    break;
                }
            },
            WorkerRequest::Terminate => break,
            WorkerRequest::Operation { job_id, operation } => {
                let response = match kernel.as_deref_mut() {
                    Some(kernel) => run_job(id, job_id, kernel, operation),
                    None => WorkerResponse::failure(job_id, EvalError::Uninitialized.to_string()),
                };
                send(response);
            }
        }
    }

    drop(kernel);
    drop(guard);
}

fn run_job(
    worker: WorkerId,
    job_id: JobId,
    kernel: &mut dyn GeometryKernel,
    job: csg_tree::Job<mesh_builder::EncodedMeshGroup>,
) -> WorkerResponse {
    log::debug!("Worker {worker} evaluating job {job_id}");
    let outcome = catch_unwind(AssertUnwindSafe(|| evaluate(kernel, &job)))
        .unwrap_or_else(|payload| Err(EvalError::Panicked(panic_message(payload.as_ref()))));
    match outcome {
        Ok(output) => WorkerResponse::success(job_id, output),
        Err(err) => {
            log::error!("Job {job_id} failed on worker {worker}: {err}");
            WorkerResponse::failure(job_id, err.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
