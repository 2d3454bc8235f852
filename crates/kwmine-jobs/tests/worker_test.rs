//! Worker tests against the in-memory job repository.

use std::sync::Arc;
use std::time::Duration;

use kwmine_core::{
    Error, JobRepository, JobStatus, KeywordFilter, MemoryStore, MorphAnalyzer, Morpheme,
    RawReview, Result, Stopwords,
};
use kwmine_inference::MockEmbedder;
use kwmine_jobs::{
    JobKind, KeywordPipelineHandler, NoOpHandler, PipelineBuilder, WorkerBuilder, WorkerConfig,
    WorkerEvent,
};
use tokio::sync::broadcast;
use uuid::Uuid;

struct NounAnalyzer;

impl MorphAnalyzer for NounAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>> {
        if text.contains("FAIL") {
            return Err(Error::Analysis("analyzer crashed".into()));
        }
        Ok(text
            .split_whitespace()
            .map(|w| Morpheme::new(w, w, "NNG"))
            .collect())
    }

    fn name(&self) -> &str {
        "nouns"
    }
}

fn pipeline_handler(store: &MemoryStore) -> KeywordPipelineHandler {
    let pipeline = PipelineBuilder::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(NounAnalyzer),
        Arc::new(MockEmbedder::new(8)),
        KeywordFilter::new(Stopwords::builtin().unwrap()),
    )
    .build();
    KeywordPipelineHandler::new(pipeline)
}

fn fast_config() -> WorkerConfig {
    WorkerConfig::default().with_poll_interval(10)
}

fn finished_job(event: &WorkerEvent) -> Option<Uuid> {
    match event {
        WorkerEvent::JobCompleted { job_id, .. } | WorkerEvent::JobFailed { job_id, .. } => {
            Some(*job_id)
        }
        _ => None,
    }
}

/// Wait for the terminal event of `job_id`.
async fn wait_for_job(events: &mut broadcast::Receiver<WorkerEvent>, job_id: Uuid) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(event) if finished_job(&event) == Some(job_id) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("worker event bus closed"),
            }
        }
    })
    .await
    .expect("job did not finish in time")
}

#[tokio::test]
async fn test_worker_completes_pipeline_job() {
    let store = MemoryStore::with_reviews(vec![
        RawReview::new(1, "커피 라떼 디저트"),
        RawReview::new(1, "커피 분위기"),
    ]);
    let job_id = store.create(JobKind::ExtractAndCluster).await.unwrap();

    let handle = WorkerBuilder::new(Arc::new(store.clone()))
        .with_config(fast_config())
        .with_handler(pipeline_handler(&store))
        .build()
        .start();
    let mut events = handle.events();

    let event = wait_for_job(&mut events, job_id).await;
    assert!(matches!(event, WorkerEvent::JobCompleted { .. }));
    handle.stop().await.unwrap();

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert!(job.completed_at.is_some());

    let result = job.result.expect("report stored");
    assert_eq!(result["extraction"]["places"], 1);
    assert_eq!(result["extraction"]["reviews_analyzed"], 2);
    assert_eq!(result["clustering"]["places_total"], 1);
}

#[tokio::test]
async fn test_worker_records_pipeline_failure() {
    let store = MemoryStore::with_reviews(vec![RawReview::new(1, "커피 FAIL")]);
    let job_id = store.create(JobKind::ExtractOnly).await.unwrap();

    let handle = WorkerBuilder::new(Arc::new(store.clone()))
        .with_config(fast_config())
        .with_handler(pipeline_handler(&store))
        .build()
        .start();
    let mut events = handle.events();

    let event = wait_for_job(&mut events, job_id).await;
    assert!(matches!(event, WorkerEvent::JobFailed { .. }));
    handle.stop().await.unwrap();

    let job = store.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("analyzer crashed"));
}

#[tokio::test]
async fn test_worker_fails_job_without_handler() {
    let store = MemoryStore::new();
    let job_id = store.create(JobKind::ClusterOnly).await.unwrap();

    let handle = WorkerBuilder::new(Arc::new(store.clone()))
        .with_config(fast_config())
        .with_handler(NoOpHandler::new(JobKind::ExtractOnly))
        .build()
        .start();
    let mut events = handle.events();

    let event = wait_for_job(&mut events, job_id).await;
    match event {
        WorkerEvent::JobFailed { kind, error, .. } => {
            assert_eq!(kind, JobKind::ClusterOnly);
            assert!(error.contains("No handler"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn test_process_next_runs_jobs_in_creation_order() {
    let store = MemoryStore::new();
    let first = store.create(JobKind::ExtractOnly).await.unwrap();
    let second = store.create(JobKind::ExtractOnly).await.unwrap();

    let worker = WorkerBuilder::new(Arc::new(store.clone()))
        .with_handler(NoOpHandler::new(JobKind::ExtractOnly))
        .build();

    assert_eq!(worker.pending_count().await.unwrap(), 2);
    assert!(worker.process_next().await.unwrap());
    assert_eq!(
        store.get(first).await.unwrap().unwrap().status,
        JobStatus::Completed
    );
    assert_eq!(
        store.get(second).await.unwrap().unwrap().status,
        JobStatus::Pending
    );

    assert!(worker.process_next().await.unwrap());
    assert!(!worker.process_next().await.unwrap());
    assert_eq!(worker.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_disabled_worker_leaves_queue_untouched() {
    let store = MemoryStore::new();
    let job_id = store.create(JobKind::ExtractOnly).await.unwrap();

    let handle = WorkerBuilder::new(Arc::new(store.clone()))
        .with_config(fast_config().with_enabled(false))
        .with_handler(NoOpHandler::new(JobKind::ExtractOnly))
        .build()
        .start();
    handle.stop().await.unwrap();

    assert_eq!(
        store.get(job_id).await.unwrap().unwrap().status,
        JobStatus::Pending
    );
}
