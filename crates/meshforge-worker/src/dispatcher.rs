//! Execution dispatcher: sync and async submission over one worker pool.
//!
//! A single semaphore of `pool_size` permits bounds concurrent conversions
//! across both modes. Sync callers take a permit without waiting; async
//! submissions reserve a slot in a bounded queue drained by `pool_size`
//! worker tasks. Capacity is checked before a job is created, so a rejected
//! submission leaves no trace in the job store.
//!
//! Each conversion runs in its own spawned task under a wall-clock bound.
//! A panic or a timeout ends that task only; the job is failed and any
//! artifact it wrote is purged. Sync submitters await a supervising task
//! rather than driving the conversion themselves; dropping the submitter
//! detaches it and the job still reaches a terminal state.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use meshforge_converter::{ConversionError, ConversionPipeline, ConversionRequest};
use meshforge_core::config::WorkerConfig;
use meshforge_core::error::AppError;
use meshforge_core::result::AppResult;
use meshforge_core::types::JobId;
use meshforge_entity::{ExecutionMode, FailureKind, Job, JobFailure};

use crate::store::JobStore;

/// Pool sizing and time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Concurrent conversions (and async workers).
    pub pool_size: usize,
    /// Async submissions that may wait for a worker.
    pub queue_capacity: usize,
    /// Wall-clock bound per conversion.
    pub conversion_timeout: Duration,
    /// How long shutdown waits for in-flight conversions.
    pub shutdown_grace: Duration,
}

impl From<&WorkerConfig> for DispatcherSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            pool_size: config.pool_size.max(1),
            queue_capacity: config.queue_capacity.max(1),
            conversion_timeout: Duration::from_secs(config.conversion_timeout_seconds),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
        }
    }
}

/// An async submission waiting for a worker.
#[derive(Debug)]
struct QueuedJob {
    id: JobId,
    request: Arc<ConversionRequest>,
}

/// State shared by the dispatcher front end and its workers.
#[derive(Debug)]
struct DispatchCore {
    store: Arc<JobStore>,
    pipeline: ConversionPipeline,
    slots: Arc<Semaphore>,
    timeout: Duration,
}

impl DispatchCore {
    /// Run a started job to a terminal state. The permit is held throughout.
    async fn run(
        &self,
        id: JobId,
        request: Arc<ConversionRequest>,
        _permit: OwnedSemaphorePermit,
    ) -> AppResult<Job> {
        let pipeline = self.pipeline.clone();
        let task_request = Arc::clone(&request);
        let mut handle = tokio::spawn(async move { pipeline.convert(id, &task_request).await });

        let outcome = match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(job_id = %id, panic = join_error.is_panic(), "Conversion task died");
                let err = ConversionError::from(join_error);
                self.pipeline.metrics().record_failure(err.kind());
                Err(err)
            }
            Err(_) => {
                warn!(
                    job_id = %id,
                    timeout_s = self.timeout.as_secs(),
                    "Conversion timed out, aborting"
                );
                handle.abort();
                let _ = handle.await;
                let err = ConversionError::Timeout {
                    timeout_seconds: self.timeout.as_secs(),
                };
                self.pipeline.metrics().record_failure(err.kind());
                Err(err)
            }
        };

        match outcome {
            Ok(artifact) => match self.store.complete(id, artifact) {
                Ok(job) => Ok(job),
                Err(e) => {
                    error!(job_id = %id, error = %e, "Failed to record completion");
                    self.purge_artifacts(id).await;
                    Err(e.into())
                }
            },
            Err(err) => {
                self.purge_artifacts(id).await;
                Ok(self.store.fail(id, err.failure())?)
            }
        }
    }

    /// Run a started job on its own task. The permit and the final state
    /// transition travel with the task, so a submitter that stops waiting
    /// cannot strand the job or free its slot early.
    fn spawn_run(
        self: &Arc<Self>,
        id: JobId,
        request: Arc<ConversionRequest>,
        permit: OwnedSemaphorePermit,
    ) -> JoinHandle<AppResult<Job>> {
        let core = Arc::clone(self);
        tokio::spawn(async move { core.run(id, request, permit).await })
    }

    async fn purge_artifacts(&self, id: JobId) {
        if let Err(e) = self.pipeline.artifacts().delete_for_job(id).await {
            warn!(job_id = %id, error = %e, "Failed to purge artifacts of failed job");
        }
    }

    /// Fail a queued job that will never be started.
    fn abandon(&self, id: JobId, reason: &str) {
        let failure = JobFailure::new(FailureKind::Cancelled, reason);
        match self.store.fail(id, failure) {
            Ok(_) => self.pipeline.metrics().record_failure(FailureKind::Cancelled),
            Err(e) => debug!(job_id = %id, error = %e, "Queued job already terminal"),
        }
    }
}

/// Accepts conversion submissions and runs them on a bounded pool.
#[derive(Debug)]
pub struct ExecutionDispatcher {
    core: Arc<DispatchCore>,
    settings: DispatcherSettings,
    queue: mpsc::Sender<QueuedJob>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    workers: StdMutex<Vec<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl ExecutionDispatcher {
    /// Create the dispatcher and spawn its workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        store: Arc<JobStore>,
        pipeline: ConversionPipeline,
        settings: DispatcherSettings,
    ) -> Self {
        let core = Arc::new(DispatchCore {
            store,
            pipeline,
            slots: Arc::new(Semaphore::new(settings.pool_size)),
            timeout: settings.conversion_timeout,
        });
        let (queue, receiver) = mpsc::channel(settings.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let shutdown = CancellationToken::new();

        let workers = (0..settings.pool_size)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&core),
                    Arc::clone(&receiver),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(
            pool_size = settings.pool_size,
            queue_capacity = settings.queue_capacity,
            timeout_s = settings.conversion_timeout.as_secs(),
            "Execution dispatcher started"
        );

        Self {
            core,
            settings,
            queue,
            receiver,
            workers: StdMutex::new(workers),
            shutdown,
        }
    }

    /// The job store.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.core.store
    }

    /// The conversion pipeline.
    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.core.pipeline
    }

    /// Settings in force.
    pub fn settings(&self) -> DispatcherSettings {
        self.settings
    }

    /// Conversion slots not currently in use.
    pub fn available_slots(&self) -> usize {
        self.core.slots.available_permits()
    }

    /// Async submissions waiting for a worker.
    pub fn queued(&self) -> usize {
        self.settings.queue_capacity - self.queue.capacity()
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn capacity_error(&self, message: String) -> AppError {
        self.core.pipeline.metrics().record_capacity_rejection();
        AppError::capacity(message)
    }

    /// Submit a request in its own execution mode.
    ///
    /// Sync submissions return the terminal job; async ones return the
    /// Pending job immediately.
    #[instrument(skip(self, request), fields(mode = %request.mode))]
    pub async fn submit(&self, request: ConversionRequest) -> AppResult<Job> {
        if self.is_shutting_down() {
            return Err(self.capacity_error("dispatcher is shutting down".to_string()));
        }
        self.core.store.validator().validate(&request)?;

        match request.mode {
            ExecutionMode::Sync => self.submit_sync(request).await,
            ExecutionMode::Async => self.submit_async(request),
        }
    }

    async fn submit_sync(&self, request: ConversionRequest) -> AppResult<Job> {
        let permit = Arc::clone(&self.core.slots)
            .try_acquire_owned()
            .map_err(|_| {
                self.capacity_error(format!(
                    "all {} conversion slots are in use",
                    self.settings.pool_size
                ))
            })?;

        let job = self.core.store.create(&request)?;
        self.core.store.start(job.id)?;
        self.core
            .spawn_run(job.id, Arc::new(request), permit)
            .await
            .map_err(|e| {
                AppError::internal(format!("supervisor of job {} stopped: {e}", job.id))
            })?
    }

    fn submit_async(&self, request: ConversionRequest) -> AppResult<Job> {
        let slot = self.queue.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => self.capacity_error(format!(
                "conversion queue is full ({} waiting)",
                self.settings.queue_capacity
            )),
            mpsc::error::TrySendError::Closed(()) => {
                self.capacity_error("conversion queue is closed".to_string())
            }
        })?;

        let job = self.core.store.create(&request)?;
        slot.send(QueuedJob {
            id: job.id,
            request: Arc::new(request),
        });
        debug!(job_id = %job.id, "Job queued");
        Ok(job)
    }

    /// Cancel a Pending job.
    pub fn cancel(&self, id: JobId) -> AppResult<Job> {
        let job = self.core.store.cancel(id)?;
        self.core
            .pipeline
            .metrics()
            .record_failure(FailureKind::Cancelled);
        Ok(job)
    }

    /// Stop accepting work, let in-flight conversions finish within the
    /// grace period, and fail whatever is still queued.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        info!("Dispatcher received shutdown signal, waiting for in-flight conversions...");

        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let pool = self.settings.pool_size as u32;
        let drain = async {
            join_all(workers).await;
            let _ = self.core.slots.acquire_many(pool).await;
        };
        if tokio::time::timeout(self.settings.shutdown_grace, drain)
            .await
            .is_err()
        {
            warn!(
                grace_s = self.settings.shutdown_grace.as_secs(),
                "Grace period elapsed with conversions still running"
            );
        }

        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut abandoned = 0;
        while let Ok(queued) = receiver.try_recv() {
            self.core
                .abandon(queued.id, "service shut down before the job started");
            abandoned += 1;
        }

        info!(abandoned, "Dispatcher shut down complete");
    }
}

async fn worker_loop(
    worker: usize,
    core: Arc<DispatchCore>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    shutdown: CancellationToken,
) {
    debug!(worker, "Worker started");

    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                queued = receiver.recv() => queued,
            }
        };
        let Some(QueuedJob { id, request }) = next else {
            break;
        };

        let permit = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            permit = Arc::clone(&core.slots).acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            core.abandon(id, "service shut down before the job started");
            break;
        };

        if let Err(e) = core.store.start(id) {
            debug!(worker, job_id = %id, error = %e, "Skipping job that can no longer start");
            continue;
        }

        if let Err(e) = core.run(id, request, permit).await {
            error!(worker, job_id = %id, error = %e, "Failed to finalize job");
        }
    }

    debug!(worker, "Worker stopped");
}
