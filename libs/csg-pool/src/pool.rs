//! # CSG Pool
//!
//! Schedules jobs across worker threads.
//!
//! A single actor task owns the workers and the job table; [`CsgPool`] is a
//! cheap handle sending it commands. Worker responses arrive on one shared
//! event channel and are handled by the same task, so the job table is
//! never touched concurrently.
//!
//! ## Scheduling
//!
//! Every worker has a counter of jobs dispatched to it. A job goes to the
//! worker with the lowest counter (the first one on ties) and increments
//! it. Counters are cumulative and never decremented on completion.
//!
//! ## Worker lifecycle
//!
//! Workers start lazily on the first [`CsgPool::initialize`] or
//! [`CsgPool::dispatch`]. Start-up succeeds when at least one worker
//! answers `Ready`; workers that crash are dropped. When a worker
//! terminates, every job assigned to it is rejected and the remaining
//! jobs' worker indices are shifted down to match the shrunk list.

use std::collections::BTreeMap;
use std::sync::Arc;

use config::constants::PoolConfig;
use csg_kernel::{BuiltinKernelFactory, KernelFactory};
use csg_tree::{into_outcome, validate_job, Job, JobId, JobOutput, WorkerRequest, WorkerResponse};
use csg_worker::{WorkerEvent, WorkerHandle, WorkerId};
use hashbrown::{HashMap, HashSet};
use mesh_builder::{EncodedMeshGroup, FinalizeHints, MeshBuilder};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::error::{PoolError, PoolResult};

type Reply<T> = oneshot::Sender<PoolResult<T>>;

/// Snapshot of the pool's bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub worker_count: usize,
    /// Cumulative dispatch counter per worker, in worker order.
    pub job_counts: Vec<u64>,
    /// Jobs dispatched and not yet answered.
    pub pending_jobs: usize,
}

// =============================================================================
// CLIENT HANDLE
// =============================================================================

/// Handle to a pool of CSG workers.
///
/// Cloning yields another handle to the same pool. The workers shut down
/// once every handle is dropped or [`CsgPool::dispose`] is called.
#[derive(Debug, Clone)]
pub struct CsgPool {
    commands: UnboundedSender<Command>,
}

impl CsgPool {
    /// Pool running the built-in kernel.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_factory(config, Arc::new(BuiltinKernelFactory))
    }

    /// Pool whose workers load kernels through `factory`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_factory(config: PoolConfig, factory: Arc<dyn KernelFactory>) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (events, event_inbox) = mpsc::unbounded_channel();
        let actor = PoolActor::new(config, factory, events);
        tokio::spawn(actor.run(inbox, event_inbox));
        Self { commands }
    }

    /// Starts the workers if needed and waits for their handshake.
    ///
    /// ## Errors
    ///
    /// [`PoolError::InitFailed`] when no worker became ready,
    /// [`PoolError::Disposed`] after [`CsgPool::dispose`].
    pub async fn initialize(&self) -> PoolResult<()> {
        self.request(Command::Initialize).await?
    }

    /// Validates `job`, sends it to the least-loaded worker and waits for
    /// its result.
    ///
    /// ## Errors
    ///
    /// - [`PoolError::Protocol`] when a leaf or operation is invalid
    /// - [`PoolError::JobFailed`] when evaluation failed on the worker
    /// - [`PoolError::WorkerTerminated`] when the worker exited first
    /// - any pool-level error
    pub async fn dispatch(&self, job: Job<EncodedMeshGroup>) -> PoolResult<JobOutput> {
        validate_job(&job)?;
        self.request(|reply| Command::Dispatch { job, reply }).await?
    }

    /// Finalizes every builder leaf of `job` and dispatches it.
    ///
    /// Leaves must be connected; their triangles are grouped by the
    /// materials present in `materials`, and output submeshes carry the
    /// same material IDs.
    ///
    /// ## Errors
    ///
    /// [`PoolError::Mesh`] when a leaf is not connected, then as
    /// [`CsgPool::dispatch`].
    pub async fn dispatch_builders<M>(
        &self,
        job: Job<MeshBuilder>,
        materials: &BTreeMap<u32, M>,
        hints: FinalizeHints,
    ) -> PoolResult<JobOutput>
    where
        M: Clone + Sync,
    {
        let job = encode_job(&job, materials, hints)?;
        self.dispatch(job).await
    }

    pub async fn stats(&self) -> PoolResult<PoolStats> {
        self.request(Command::Stats).await
    }

    /// Number of live workers; zero before start-up.
    pub async fn worker_count(&self) -> PoolResult<usize> {
        Ok(self.stats().await?.worker_count)
    }

    /// Cumulative dispatch counters, in worker order.
    pub async fn job_counts(&self) -> PoolResult<Vec<u64>> {
        Ok(self.stats().await?.job_counts)
    }

    /// Asks every worker to terminate and refuses further work.
    ///
    /// Jobs already queued on a worker still complete before it exits.
    pub async fn dispose(&self) -> PoolResult<()> {
        self.request(Command::Dispose).await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> PoolResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| PoolError::ChannelClosed)?;
        response.await.map_err(|_| PoolError::ChannelClosed)
    }
}

/// Converts every builder leaf of `job` into its wire form.
///
/// ## Errors
///
/// [`PoolError::Mesh`] for the first leaf that is not connected.
pub fn encode_job<M>(
    job: &Job<MeshBuilder>,
    materials: &BTreeMap<u32, M>,
    hints: FinalizeHints,
) -> PoolResult<Job<EncodedMeshGroup>>
where
    M: Clone + Sync,
{
    job.try_map_leaves(|builder: &MeshBuilder| -> PoolResult<EncodedMeshGroup> {
        let finalized = builder.finalize(materials, hints, true)?;
        Ok(finalized.into_encoded())
    })
}

// =============================================================================
// ACTOR
// =============================================================================

enum Command {
    Initialize(Reply<()>),
    Dispatch {
        job: Job<EncodedMeshGroup>,
        reply: Reply<JobOutput>,
    },
    Stats(oneshot::Sender<PoolStats>),
    Dispose(oneshot::Sender<()>),
}

struct WorkerSlot {
    handle: WorkerHandle,
    jobs: u64,
}

struct PendingJob {
    /// Index into the worker list.
    worker: usize,
    reply: Reply<JobOutput>,
}

enum StartState {
    Idle,
    Starting {
        outstanding: HashSet<WorkerId>,
        ready: usize,
        failures: Vec<String>,
        waiters: Vec<Reply<()>>,
        queued: Vec<(Job<EncodedMeshGroup>, Reply<JobOutput>)>,
    },
    Ready,
    Failed(String),
}

struct PoolActor {
    config: PoolConfig,
    factory: Arc<dyn KernelFactory>,
    events: UnboundedSender<WorkerEvent>,
    workers: Vec<WorkerSlot>,
    jobs: HashMap<JobId, PendingJob>,
    next_job: JobId,
    next_worker: WorkerId,
    state: StartState,
    disposed: bool,
}

impl PoolActor {
    fn new(config: PoolConfig, factory: Arc<dyn KernelFactory>, events: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            config,
            factory,
            events,
            workers: Vec::new(),
            jobs: HashMap::new(),
            next_job: 0,
            next_worker: 0,
            state: StartState::Idle,
            disposed: false,
        }
    }

    async fn run(mut self, mut commands: UnboundedReceiver<Command>, mut events: UnboundedReceiver<WorkerEvent>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event),
            }
        }
        log::debug!("All pool handles dropped");
        self.dispose();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Initialize(reply) => {
                if self.disposed {
                    let _ = reply.send(Err(PoolError::Disposed));
                    return;
                }
                if matches!(self.state, StartState::Idle) {
                    self.start();
                }
                match &mut self.state {
                    StartState::Starting { waiters, .. } => waiters.push(reply),
                    StartState::Ready => {
                        let _ = reply.send(Ok(()));
                    }
                    StartState::Failed(message) => {
                        let _ = reply.send(Err(PoolError::InitFailed(message.clone())));
                    }
                    StartState::Idle => {}
                }
            }
            Command::Dispatch { job, reply } => {
                if self.disposed {
                    let _ = reply.send(Err(PoolError::Disposed));
                    return;
                }
                if matches!(self.state, StartState::Idle) {
                    self.start();
                }
                match &mut self.state {
                    StartState::Starting { queued, .. } => queued.push((job, reply)),
                    StartState::Ready => self.dispatch(job, reply),
                    StartState::Failed(message) => {
                        let _ = reply.send(Err(PoolError::InitFailed(message.clone())));
                    }
                    StartState::Idle => {}
                }
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Dispose(reply) => {
                self.dispose();
                let _ = reply.send(());
            }
        }
    }

    fn handle_event(&mut self, WorkerEvent { worker, response }: WorkerEvent) {
        match response {
            WorkerResponse::Created => log::debug!("Worker {worker} created"),
            WorkerResponse::Ready => {
                if let StartState::Starting {
                    outstanding, ready, ..
                } = &mut self.state
                {
                    if outstanding.remove(&worker) {
                        *ready += 1;
                    }
                }
                self.check_started();
            }
            WorkerResponse::Crash { error } => {
                log::warn!("Worker {worker} crashed: {error}");
                self.remove_worker(worker);
                self.start_failure(worker, error);
            }
            WorkerResponse::Terminated => {
                log::info!("Worker {worker} terminated");
                self.remove_worker(worker);
                self.start_failure(worker, format!("worker {worker} terminated during start-up"));
            }
            response @ WorkerResponse::Result { .. } => {
                if let Some((job_id, outcome)) = into_outcome(response) {
                    self.complete(job_id, outcome);
                }
            }
        }
    }

    fn start(&mut self) {
        let mut outstanding = HashSet::new();
        let mut failures = Vec::new();
        for _ in 0..self.config.worker_count {
            let id = self.next_worker;
            self.next_worker += 1;
            match WorkerHandle::spawn(id, Arc::clone(&self.factory), self.events.clone()) {
                Ok(handle) => {
                    handle.send(WorkerRequest::Initialize {
                        library_path: self.config.library_path.clone(),
                    });
                    outstanding.insert(id);
                    self.workers.push(WorkerSlot { handle, jobs: 0 });
                }
                Err(err) => {
                    log::warn!("Failed to spawn worker {id}: {err}");
                    failures.push(err.to_string());
                }
            }
        }
        log::info!("Starting {} workers", outstanding.len());
        self.state = StartState::Starting {
            outstanding,
            ready: 0,
            failures,
            waiters: Vec::new(),
            queued: Vec::new(),
        };
        self.check_started();
    }

    /// Records that `worker` will never become ready.
    fn start_failure(&mut self, worker: WorkerId, error: String) {
        if let StartState::Starting {
            outstanding,
            failures,
            ..
        } = &mut self.state
        {
            if outstanding.remove(&worker) {
                failures.push(error);
            }
        }
        self.check_started();
    }

    /// Leaves the starting state once every worker has answered.
    fn check_started(&mut self) {
        let StartState::Starting { outstanding, .. } = &self.state else {
            return;
        };
        if !outstanding.is_empty() {
            return;
        }
        let StartState::Starting {
            ready,
            failures,
            waiters,
            queued,
            ..
        } = std::mem::replace(&mut self.state, StartState::Ready)
        else {
            return;
        };

        if ready == 0 {
            let message = if failures.is_empty() {
                "no workers configured".to_string()
            } else {
                failures.join("; ")
            };
            log::error!("Pool initialization failed: {message}");
            self.state = StartState::Failed(message.clone());
            for waiter in waiters {
                let _ = waiter.send(Err(PoolError::InitFailed(message.clone())));
            }
            for (_, reply) in queued {
                let _ = reply.send(Err(PoolError::InitFailed(message.clone())));
            }
            return;
        }

        if !failures.is_empty() {
            log::warn!(
                "{} of {} workers failed to start",
                failures.len(),
                failures.len() + ready
            );
        }
        log::info!("Pool ready with {ready} workers");
        for waiter in waiters {
            let _ = waiter.send(Ok(()));
        }
        for (job, reply) in queued {
            self.dispatch(job, reply);
        }
    }

    fn dispatch(&mut self, job: Job<EncodedMeshGroup>, reply: Reply<JobOutput>) {
        let Some(index) = self.least_loaded() else {
            let _ = reply.send(Err(PoolError::NoWorkers));
            return;
        };
        let job_id = self.next_job;
        self.next_job += 1;

        let slot = &mut self.workers[index];
        slot.jobs += 1;
        log::debug!(
            "Dispatching job {job_id} to worker {} (count {})",
            slot.handle.id(),
            slot.jobs
        );
        if !slot.handle.send(WorkerRequest::Operation {
            job_id,
            operation: job,
        }) {
            // Its termination event is still queued and will reject the job.
            log::warn!("Worker {} already exited", slot.handle.id());
        }
        self.jobs.insert(job_id, PendingJob { worker: index, reply });
    }

    fn least_loaded(&self) -> Option<usize> {
        self.workers
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.jobs)
            .map(|(index, _)| index)
    }

    fn complete(&mut self, job_id: JobId, outcome: Result<JobOutput, String>) {
        let Some(job) = self.jobs.remove(&job_id) else {
            log::warn!("Dropping result for unknown job {job_id}");
            return;
        };
        let _ = job.reply.send(outcome.map_err(PoolError::JobFailed));
    }

    /// Drops `worker`, rejecting its jobs and re-indexing the others.
    fn remove_worker(&mut self, worker: WorkerId) {
        let Some(index) = self.workers.iter().position(|s| s.handle.id() == worker) else {
            return;
        };
        self.workers.remove(index);
        for (job_id, job) in self.jobs.extract_if(|_, job| job.worker == index) {
            log::warn!("Job {job_id} lost with worker {worker}");
            let _ = job.reply.send(Err(PoolError::WorkerTerminated { job: job_id }));
        }
        for job in self.jobs.values_mut() {
            if job.worker > index {
                job.worker -= 1;
            }
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        log::info!("Disposing pool with {} workers", self.workers.len());
        for slot in &self.workers {
            slot.handle.send(WorkerRequest::Terminate);
        }
        if let StartState::Starting {
            waiters, queued, ..
        } = std::mem::replace(&mut self.state, StartState::Failed("pool disposed".to_string()))
        {
            for waiter in waiters {
                let _ = waiter.send(Err(PoolError::Disposed));
            }
            for (_, reply) in queued {
                let _ = reply.send(Err(PoolError::Disposed));
            }
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            worker_count: self.workers.len(),
            job_counts: self.workers.iter().map(|s| s.jobs).collect(),
            pending_jobs: self.jobs.len(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use csg_tree::{FinalQuery, OperationTree, QueryValue};

    fn actor(workers: usize) -> (PoolActor, UnboundedReceiver<WorkerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let config = PoolConfig::new(workers, config::constants::BUILTIN_KERNEL_PATH).unwrap();
        (PoolActor::new(config, Arc::new(BuiltinKernelFactory), events), rx)
    }

    /// Feeds worker events to `actor` until it leaves the starting state.
    fn start(actor: &mut PoolActor, rx: &mut UnboundedReceiver<WorkerEvent>) {
        actor.start();
        while matches!(actor.state, StartState::Starting { .. }) {
            let event = rx.blocking_recv().unwrap();
            actor.handle_event(event);
        }
    }

    fn job() -> Job<EncodedMeshGroup> {
        OperationTree::cube([1.0; 3], false).query(FinalQuery::NumTri)
    }

    #[test]
    fn test_least_loaded_is_cumulative() {
        let (mut actor, mut rx) = actor(2);
        start(&mut actor, &mut rx);
        assert!(matches!(actor.state, StartState::Ready));

        let mut replies = Vec::new();
        for _ in 0..3 {
            let (reply, response) = oneshot::channel();
            actor.dispatch(job(), reply);
            replies.push(response);
        }
        assert_eq!(actor.stats().job_counts, vec![2, 1]);

        // Completions do not lower the counters.
        while actor.stats().pending_jobs > 0 {
            let event = rx.blocking_recv().unwrap();
            actor.handle_event(event);
        }
        assert_eq!(actor.stats().job_counts, vec![2, 1]);
        for mut response in replies {
            assert_eq!(
                response.try_recv().unwrap(),
                Ok(JobOutput::Query(QueryValue::Count { value: 12 }))
            );
        }
    }

    #[test]
    fn test_termination_rejects_and_shifts() {
        let (mut actor, mut rx) = actor(2);
        start(&mut actor, &mut rx);
        let first = actor.workers[0].handle.id();

        let (reply_a, mut response_a) = oneshot::channel();
        actor.dispatch(job(), reply_a);
        let (reply_b, mut response_b) = oneshot::channel();
        actor.dispatch(job(), reply_b);
        assert_eq!(actor.jobs[&1].worker, 1);

        actor.handle_event(WorkerEvent {
            worker: first,
            response: WorkerResponse::Terminated,
        });
        assert_eq!(
            response_a.try_recv().unwrap(),
            Err(PoolError::WorkerTerminated { job: 0 })
        );
        assert_eq!(actor.workers.len(), 1);
        assert_eq!(actor.jobs[&1].worker, 0);

        // The first worker's real result is now for an unknown job.
        while actor.stats().pending_jobs > 0 {
            let event = rx.blocking_recv().unwrap();
            actor.handle_event(event);
        }
        assert!(response_b.try_recv().unwrap().is_ok());
        actor.dispose();
    }

    #[test]
    fn test_no_workers_left() {
        let (mut actor, mut rx) = actor(1);
        start(&mut actor, &mut rx);
        let only = actor.workers[0].handle.id();
        actor.handle_event(WorkerEvent {
            worker: only,
            response: WorkerResponse::Terminated,
        });
        let (reply, mut response) = oneshot::channel();
        actor.dispatch(job(), reply);
        assert_eq!(response.try_recv().unwrap(), Err(PoolError::NoWorkers));
    }

    #[test]
    fn test_unknown_job_result_is_dropped() {
        let (mut actor, _rx) = actor(1);
        actor.handle_event(WorkerEvent {
            worker: 0,
            response: WorkerResponse::success(99, JobOutput::Query(QueryValue::Bool { value: true })),
        });
        assert_eq!(actor.stats(), PoolStats::default());
    }
}
