//! Job handlers for keyword pipeline jobs.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use kwmine_core::{JobKind, KeywordJob, ProgressSink};

/// Progress callback type for job handlers.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: KeywordJob,
    /// Progress callback for updating job progress.
    progress_callback: Option<ProgressCallback>,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: KeywordJob) -> Self {
        Self {
            job,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, percent: i32, stage: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, stage);
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    pub fn kind(&self) -> JobKind {
        self.job.kind
    }
}

impl ProgressSink for JobContext {
    fn report(&self, percent: i32, stage: &str) {
        self.report_progress(percent, Some(stage));
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully with optional result data.
    Success(Option<JsonValue>),
    /// Job failed with an error message.
    Failed(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Handler name for logs.
    fn name(&self) -> &str;

    /// Check if this handler can process the given job kind.
    fn can_handle(&self, kind: JobKind) -> bool;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for testing.
pub struct NoOpHandler {
    kind: JobKind,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given job kind.
    pub fn new(kind: JobKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn name(&self) -> &str {
        "noop"
    }

    fn can_handle(&self, kind: JobKind) -> bool {
        self.kind == kind
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        ctx.report_progress(50, Some("processing"));
        ctx.report_progress(100, Some("done"));
        JobResult::Success(None)
    }
}
