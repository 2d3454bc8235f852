//! In-memory implementations of the storage traits.
//!
//! Used by tests and dry runs. Semantics follow the PostgreSQL repositories:
//! keyword runs are staged and only visible after commit, cluster writes are
//! per place, and jobs are claimed oldest first.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::{ClusterStore, JobRepository, KeywordCountRun, KeywordStore, ReviewSource};

#[derive(Debug, Default)]
struct MemoryState {
    places: BTreeSet<PlaceId>,
    reviews: Vec<RawReview>,
    keywords: Vec<KeywordCount>,
    rows: Vec<ClusteredKeywordRow>,
    summaries: Vec<ClusterSummary>,
    jobs: Vec<KeywordJob>,
    failing_places: HashSet<PlaceId>,
    keyword_runs_committed: usize,
}

/// Shared in-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with reviews.
    pub fn with_reviews(reviews: impl IntoIterator<Item = RawReview>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.reviews.extend(reviews);
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(poisoned)
    }

    /// Register a place that may have no reviews.
    pub fn add_place(&self, place_id: PlaceId) -> Result<()> {
        self.lock()?.places.insert(place_id);
        Ok(())
    }

    pub fn add_review(&self, review: RawReview) -> Result<()> {
        self.lock()?.reviews.push(review);
        Ok(())
    }

    /// Make [`ClusterStore::write_place`] fail for `place_id`.
    pub fn fail_cluster_writes_for(&self, place_id: PlaceId) -> Result<()> {
        self.lock()?.failing_places.insert(place_id);
        Ok(())
    }

    /// Replace stored keyword counts directly, bypassing extraction.
    pub fn set_keyword_counts(&self, counts: Vec<KeywordCount>) -> Result<()> {
        self.lock()?.keywords = counts;
        Ok(())
    }

    /// Every stored cluster row.
    pub fn all_rows(&self) -> Result<Vec<ClusteredKeywordRow>> {
        Ok(self.lock()?.rows.clone())
    }

    /// Every stored cluster summary.
    pub fn all_summaries(&self) -> Result<Vec<ClusterSummary>> {
        Ok(self.lock()?.summaries.clone())
    }

    /// Number of keyword runs that reached commit.
    pub fn keyword_runs_committed(&self) -> Result<usize> {
        Ok(self.lock()?.keyword_runs_committed)
    }
}

#[async_trait]
impl ReviewSource for MemoryStore {
    async fn list_place_ids(&self) -> Result<Vec<PlaceId>> {
        let state = self.lock()?;
        let mut ids = state.places.clone();
        ids.extend(state.reviews.iter().map(|r| r.place_id));
        Ok(ids.into_iter().collect())
    }

    async fn reviews_for_place(&self, place_id: PlaceId) -> Result<Vec<RawReview>> {
        let state = self.lock()?;
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.place_id == place_id)
            .cloned()
            .collect())
    }
}

/// Staged keyword run; writes land in the shared state on commit.
struct MemoryKeywordRun {
    store: MemoryStore,
    staged: Vec<KeywordCount>,
    index: BTreeMap<(PlaceId, String), usize>,
}

#[async_trait]
impl KeywordCountRun for MemoryKeywordRun {
    async fn upsert_counts(&mut self, counts: &[KeywordCount]) -> Result<u64> {
        for count in counts {
            let key = (count.place_id, count.keyword.clone());
            match self.index.get(&key) {
                Some(&i) => self.staged[i].count += count.count,
                None => {
                    self.index.insert(key, self.staged.len());
                    self.staged.push(count.clone());
                }
            }
        }
        Ok(counts.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let run = *self;
        let mut state = run.store.lock()?;
        state.keywords = run.staged;
        state.keyword_runs_committed += 1;
        Ok(())
    }
}

#[async_trait]
impl KeywordStore for MemoryStore {
    async fn begin_run(&self) -> Result<Box<dyn KeywordCountRun>> {
        Ok(Box::new(MemoryKeywordRun {
            store: self.clone(),
            staged: Vec::new(),
            index: BTreeMap::new(),
        }))
    }

    async fn list_counts(&self) -> Result<Vec<KeywordCount>> {
        Ok(self.lock()?.keywords.clone())
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.rows.clear();
        state.summaries.clear();
        Ok(())
    }

    async fn write_place(&self, place_id: PlaceId, clusters: &PlaceClusters) -> Result<()> {
        let mut state = self.lock()?;
        if state.failing_places.contains(&place_id) {
            return Err(Error::Internal(format!(
                "injected write failure for place {}",
                place_id
            )));
        }
        state.rows.extend(clusters.rows.iter().cloned());
        state.summaries.extend(clusters.summaries.iter().cloned());
        Ok(())
    }

    async fn rows_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusteredKeywordRow>> {
        let state = self.lock()?;
        let mut rows: Vec<_> = state
            .rows
            .iter()
            .filter(|r| r.place_id == place_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.cluster_id
                .cmp(&b.cluster_id)
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        Ok(rows)
    }

    async fn summaries_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusterSummary>> {
        let state = self.lock()?;
        let mut summaries: Vec<_> = state
            .summaries
            .iter()
            .filter(|s| s.place_id == place_id)
            .cloned()
            .collect();
        summaries.sort_by_key(|s| s.cluster_id);
        Ok(summaries)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn create(&self, kind: JobKind) -> Result<Uuid> {
        let id = Uuid::now_v7();
        self.lock()?.jobs.push(KeywordJob {
            id,
            kind,
            status: JobStatus::Pending,
            progress_percent: 0,
            progress_stage: None,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        });
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<KeywordJob>> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| j.created_at);
        Ok(job.map(|job| {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        stage: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) {
            job.progress_percent = percent.clamp(0, 100);
            job.progress_stage = stage.map(str::to_string);
        }
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))?;
        job.status = JobStatus::Completed;
        job.progress_percent = 100;
        job.result = result;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))?;
        job.status = JobStatus::Failed;
        job.error_message = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<KeywordJob>> {
        Ok(self.lock()?.jobs.iter().find(|j| j.id == job_id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<KeywordJob>> {
        let state = self.lock()?;
        let mut jobs = state.jobs.clone();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit.max(0) as usize);
        Ok(jobs)
    }

    async fn pending_count(&self) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .count() as i64)
    }
}
