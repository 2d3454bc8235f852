//! Job worker that polls for keyword jobs and runs them one at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use kwmine_core::defaults::{EVENT_BUS_CAPACITY, JOB_POLL_INTERVAL_MS, JOB_TIMEOUT_SECS};
use kwmine_core::{Error, JobKind, JobRepository, KeywordJob, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum wall-clock time of one job.
    pub job_timeout_secs: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: JOB_POLL_INTERVAL_MS,
            job_timeout_secs: JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `KWMINE_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `KWMINE_POLL_INTERVAL_MS` | `1000` | Polling interval when queue is empty |
    /// | `KWMINE_JOB_TIMEOUT_SECS` | `21600` | Per-job timeout |
    pub fn from_env() -> Self {
        let enabled = std::env::var("KWMINE_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("KWMINE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_POLL_INTERVAL_MS);

        let job_timeout_secs = std::env::var("KWMINE_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_TIMEOUT_SECS)
            .max(1);

        Self {
            poll_interval_ms,
            job_timeout_secs,
            enabled,
        }
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs.max(1);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { job_id: Uuid, kind: JobKind },
    /// Job progress was updated.
    JobProgress {
        job_id: Uuid,
        percent: i32,
        stage: Option<String>,
    },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, kind: JobKind },
    /// A job failed.
    JobFailed {
        job_id: Uuid,
        kind: JobKind,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to shut down after the current job.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Signal shutdown and wait for the worker loop to exit.
    pub async fn stop(self) -> Result<()> {
        // The loop may already have exited (disabled worker).
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Worker task failed: {}", e)))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that processes keyword jobs from the queue.
///
/// Jobs run strictly one after another: every pipeline run resets the
/// shared output tables.
pub struct JobWorker {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn new(jobs: Arc<dyn JobRepository>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            jobs,
            config,
            handlers: Vec::new(),
            event_tx,
        }
    }

    /// Register a handler. Earlier handlers win when several match.
    pub fn register_handler<H: JobHandler + 'static>(&mut self, handler: H) {
        debug!(handler = handler.name(), "Registered job handler");
        self.handlers.push(Arc::new(handler));
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the pending job count.
    pub async fn pending_count(&self) -> Result<i64> {
        self.jobs.pending_count().await
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
            task,
        }
    }

    #[instrument(skip(self, shutdown_rx), fields(subsystem = "jobs", component = "worker"))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            job_timeout_secs = self.config.job_timeout_secs,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => error!(error = %e, "Failed to claim job"),
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Job worker received shutdown signal");
                    break;
                }
                _ = sleep(poll_interval) => {}
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Claim and run the next pending job. Returns `false` when the queue is empty.
    pub async fn process_next(&self) -> Result<bool> {
        match self.jobs.claim_next().await? {
            Some(job) => {
                self.execute_job(job).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn execute_job(&self, job: KeywordJob) {
        let start = Instant::now();
        let job_id = job.id;
        let kind = job.kind;

        info!(%job_id, kind = kind.as_str(), "Processing job");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, kind });

        let handler = self.handlers.iter().find(|h| h.can_handle(kind)).cloned();

        let result = match handler {
            Some(handler) => {
                let (progress_tx, persister) = self.spawn_progress_persister(job_id);
                let ctx = JobContext::new(job).with_progress_callback(move |percent, stage| {
                    let _ = progress_tx.send((percent, stage.map(String::from)));
                });

                let timeout = Duration::from_secs(self.config.job_timeout_secs);
                let result = match tokio::time::timeout(timeout, handler.execute(ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            %job_id,
                            "Job exceeded timeout of {}s", self.config.job_timeout_secs
                        );
                        JobResult::Failed(format!(
                            "Job exceeded timeout of {}s",
                            self.config.job_timeout_secs
                        ))
                    }
                };
                // The context (and its sender) is gone; flush queued progress.
                if let Err(e) = persister.await {
                    warn!(%job_id, error = %e, "Progress persister task failed");
                }
                result
            }
            None => {
                warn!(kind = kind.as_str(), "No handler registered for job kind");
                JobResult::Failed(format!("No handler for job kind: {}", kind.as_str()))
            }
        };

        match result {
            JobResult::Success(result_data) => {
                if let Err(e) = self.jobs.complete(job_id, result_data).await {
                    error!(error = %e, %job_id, "Failed to mark job as completed");
                } else {
                    info!(
                        %job_id,
                        kind = kind.as_str(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job completed successfully"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id, kind });
                }
            }
            JobResult::Failed(error) => {
                if let Err(e) = self.jobs.fail(job_id, &error).await {
                    error!(error = %e, %job_id, "Failed to mark job as failed");
                } else {
                    warn!(
                        %job_id,
                        kind = kind.as_str(),
                        %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        kind,
                        error,
                    });
                }
            }
        }
    }

    /// Persist progress updates in order on a background task.
    ///
    /// Update failures are logged and never reach the handler.
    fn spawn_progress_persister(
        &self,
        job_id: Uuid,
    ) -> (mpsc::UnboundedSender<(i32, Option<String>)>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(i32, Option<String>)>();
        let jobs = self.jobs.clone();
        let event_tx = self.event_tx.clone();
        let task = tokio::spawn(async move {
            while let Some((percent, stage)) = rx.recv().await {
                if let Err(e) = jobs.update_progress(job_id, percent, stage.as_deref()).await {
                    debug!(%job_id, error = %e, "Failed to persist job progress");
                }
                let _ = event_tx.send(WorkerEvent::JobProgress {
                    job_id,
                    percent,
                    stage,
                });
            }
        });
        (tx, task)
    }
}

/// Builder for creating a job worker with handlers.
pub struct WorkerBuilder {
    jobs: Arc<dyn JobRepository>,
    config: WorkerConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self {
            jobs,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn build(self) -> JobWorker {
        let mut worker = JobWorker::new(self.jobs, self.config);
        worker.handlers = self.handlers;
        worker
    }
}
