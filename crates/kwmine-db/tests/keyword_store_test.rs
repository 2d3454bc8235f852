//! Integration tests for keyword count storage.
//!
//! Run with a reachable PostgreSQL:
//! `DATABASE_URL=postgres://... cargo test -p kwmine-db -- --ignored`

use kwmine_core::{KeywordCount, KeywordStore, RawReview, ReviewSource};
use kwmine_db::test_fixtures::TestDatabase;

async fn setup() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

fn kc(place_id: i64, keyword: &str, count: i64) -> KeywordCount {
    KeywordCount {
        place_id,
        keyword: keyword.to_string(),
        count,
    }
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_review_source_lists_all_places() {
    let test_db = setup().await;
    let db = &test_db.db;

    db.reviews.upsert_place(20, Some("두번째 카페")).await.unwrap();
    db.reviews.upsert_place(10, None).await.unwrap();
    db.reviews
        .insert(&RawReview::new(20, "커피가 맛있어요"))
        .await
        .unwrap();

    assert_eq!(db.reviews.list_place_ids().await.unwrap(), vec![10, 20]);
    assert!(db.reviews.reviews_for_place(10).await.unwrap().is_empty());

    let reviews = db.reviews.reviews_for_place(20).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].content(), Some("커피가 맛있어요"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_upsert_increments_and_commit_publishes() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(1, None).await.unwrap();

    let mut run = db.keywords.begin_run().await.unwrap();
    run.upsert_counts(&[kc(1, "커피", 1), kc(1, "분위기", 1)])
        .await
        .unwrap();
    run.upsert_counts(&[kc(1, "커피", 1), kc(1, "커피", 1)])
        .await
        .unwrap();

    run.commit().await.unwrap();
    let counts = db.keywords.list_counts().await.unwrap();
    assert_eq!(counts, vec![kc(1, "커피", 3), kc(1, "분위기", 1)]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_dropped_run_keeps_previous_counts() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(1, None).await.unwrap();

    let mut run = db.keywords.begin_run().await.unwrap();
    run.upsert_counts(&[kc(1, "라떼", 2)]).await.unwrap();
    run.commit().await.unwrap();

    let mut run = db.keywords.begin_run().await.unwrap();
    run.upsert_counts(&[kc(1, "케이크", 1)]).await.unwrap();
    drop(run);

    assert_eq!(db.keywords.list_counts().await.unwrap(), vec![kc(1, "라떼", 2)]);
    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_rerun_replaces_counts() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(1, None).await.unwrap();

    for _ in 0..2 {
        let mut run = db.keywords.begin_run().await.unwrap();
        run.upsert_counts(&[kc(1, "디저트", 1)]).await.unwrap();
        run.commit().await.unwrap();
    }

    assert_eq!(
        db.keywords.counts_for_place(1).await.unwrap(),
        vec![kc(1, "디저트", 1)]
    );
    test_db.cleanup().await;
}
