//! Integration tests for the keyword job repository.

use kwmine_core::{JobKind, JobRepository, JobStatus};
use kwmine_db::test_fixtures::TestDatabase;
use serde_json::json;

async fn setup() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_job_lifecycle() {
    let test_db = setup().await;
    let jobs = &test_db.db.jobs;

    let id = jobs.create(JobKind::ExtractAndCluster).await.unwrap();
    assert_eq!(jobs.pending_count().await.unwrap(), 1);

    let claimed = jobs.claim_next().await.unwrap().expect("job should be claimed");
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.status, JobStatus::Running);
    assert!(claimed.started_at.is_some());
    assert!(jobs.claim_next().await.unwrap().is_none());

    jobs.update_progress(id, 50, Some("extraction_completed"))
        .await
        .unwrap();
    let job = jobs.get(id).await.unwrap().unwrap();
    assert_eq!(job.progress_percent, 50);
    assert_eq!(job.progress_stage.as_deref(), Some("extraction_completed"));

    jobs.complete(id, Some(json!({"ok": true}))).await.unwrap();
    let job = jobs.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert_eq!(job.result, Some(json!({"ok": true})));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_claim_oldest_first_and_fail() {
    let test_db = setup().await;
    let jobs = &test_db.db.jobs;

    let first = jobs.create(JobKind::ExtractOnly).await.unwrap();
    let second = jobs.create(JobKind::ClusterOnly).await.unwrap();

    let claimed = jobs.claim_next().await.unwrap().unwrap();
    assert_eq!(claimed.id, first);
    assert_eq!(claimed.kind, JobKind::ExtractOnly);

    jobs.fail(first, "analyzer crashed").await.unwrap();
    let job = jobs.get(first).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some("analyzer crashed"));

    let recent = jobs.list_recent(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_complete_unknown_job_is_not_found() {
    let test_db = setup().await;
    let err = test_db
        .db
        .jobs
        .complete(uuid::Uuid::now_v7(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, kwmine_core::Error::NotFound(_)));
    test_db.cleanup().await;
}
