//! Core traits for kwmine abstractions.
//!
//! Storage, analysis and embedding are reached only through these traits so
//! that the pipeline stages can run against PostgreSQL in production and
//! in-memory stores in tests.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ANALYSIS TRAITS
// =============================================================================

/// Morphological analyzer for review text.
///
/// Implementations are CPU-bound and synchronous; callers run them on the
/// blocking thread pool.
pub trait MorphAnalyzer: Send + Sync {
    /// Split `text` into morphemes with POS tags and lemmas.
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>>;

    /// Name of the analyzer/dictionary for logs.
    fn name(&self) -> &str;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating keyword embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns one vector per input text, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Read access to scraped review data.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Every known place id, ascending. Places without reviews are included.
    async fn list_place_ids(&self) -> Result<Vec<PlaceId>>;

    /// All reviews for a place.
    async fn reviews_for_place(&self, place_id: PlaceId) -> Result<Vec<RawReview>>;
}

/// Keyword count storage.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    /// Start an extraction run: clears all stored counts inside a new
    /// transaction. Nothing is visible to readers until [`KeywordCountRun::commit`].
    async fn begin_run(&self) -> Result<Box<dyn KeywordCountRun>>;

    /// All stored counts ordered by row id.
    async fn list_counts(&self) -> Result<Vec<KeywordCount>>;
}

/// An open extraction run. Dropping it without commit discards every write.
#[async_trait]
pub trait KeywordCountRun: Send {
    /// Add `count` to each `(place_id, keyword)` row, inserting missing rows.
    async fn upsert_counts(&mut self, counts: &[KeywordCount]) -> Result<u64>;

    /// Make the reset and all upserts visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Cluster output storage.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Clear `clustered_keywords` and `cluster_summaries`.
    async fn reset(&self) -> Result<()>;

    /// Write one place's rows and summaries atomically.
    async fn write_place(&self, place_id: PlaceId, clusters: &PlaceClusters) -> Result<()>;

    /// Stored rows for a place, ordered by cluster id then keyword.
    async fn rows_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusteredKeywordRow>>;

    /// Stored summaries for a place, ordered by cluster id.
    async fn summaries_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusterSummary>>;
}

// =============================================================================
// JOB PROCESSING TRAITS
// =============================================================================

/// Repository for keyword pipeline job records.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a pending job.
    async fn create(&self, kind: JobKind) -> Result<Uuid>;

    /// Claim the oldest pending job, marking it running.
    async fn claim_next(&self) -> Result<Option<KeywordJob>>;

    /// Update job progress.
    async fn update_progress(&self, job_id: Uuid, percent: i32, stage: Option<&str>)
        -> Result<()>;

    /// Mark job as completed.
    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Mark job as failed.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get a job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<KeywordJob>>;

    /// Most recently created jobs first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<KeywordJob>>;

    /// Number of pending jobs.
    async fn pending_count(&self) -> Result<i64>;
}

/// Fire-and-forget progress reporting.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: i32, stage: &str);
}

/// Sink that discards progress.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _percent: i32, _stage: &str) {}
}

impl<F> ProgressSink for F
where
    F: Fn(i32, &str) + Send + Sync,
{
    fn report(&self, percent: i32, stage: &str) {
        self(percent, stage)
    }
}
