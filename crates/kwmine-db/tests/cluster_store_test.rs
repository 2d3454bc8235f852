//! Integration tests for cluster output storage.

use kwmine_core::{ClusterStore, ClusterSummary, ClusteredKeywordRow, PlaceClusters};
use kwmine_db::test_fixtures::TestDatabase;

async fn setup() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

fn clusters(place_id: i64) -> PlaceClusters {
    PlaceClusters {
        rows: vec![
            ClusteredKeywordRow {
                place_id,
                cluster_id: 0,
                keyword: "커피".into(),
                count: 3,
            },
            ClusteredKeywordRow {
                place_id,
                cluster_id: 0,
                keyword: "라떼".into(),
                count: 1,
            },
            ClusteredKeywordRow {
                place_id,
                cluster_id: 1,
                keyword: "분위기".into(),
                count: 2,
            },
        ],
        summaries: vec![
            ClusterSummary {
                place_id,
                cluster_id: 0,
                representative_keyword: "커피".into(),
                keyword_count: 4,
            },
            ClusterSummary {
                place_id,
                cluster_id: 1,
                representative_keyword: "분위기".into(),
                keyword_count: 2,
            },
        ],
        noise: 1,
    }
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_write_and_read_place() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(7, None).await.unwrap();

    db.clusters.reset().await.unwrap();
    db.clusters.write_place(7, &clusters(7)).await.unwrap();

    let rows = db.clusters.rows_for_place(7).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].cluster_id, 0);
    assert_eq!(rows[2].keyword, "분위기");

    let summaries = db.clusters.summaries_for_place(7).await.unwrap();
    assert_eq!(summaries, clusters(7).summaries);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_reset_clears_both_tables() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(7, None).await.unwrap();
    db.clusters.write_place(7, &clusters(7)).await.unwrap();

    db.clusters.reset().await.unwrap();

    assert!(db.clusters.rows_for_place(7).await.unwrap().is_empty());
    assert!(db.clusters.summaries_for_place(7).await.unwrap().is_empty());
    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_duplicate_summary_rolls_back_place() {
    let test_db = setup().await;
    let db = &test_db.db;
    db.reviews.upsert_place(7, None).await.unwrap();

    let mut broken = clusters(7);
    broken.summaries.push(broken.summaries[0].clone());
    assert!(db.clusters.write_place(7, &broken).await.is_err());

    // Rows inserted before the failing summary insert are rolled back too.
    assert!(db.clusters.rows_for_place(7).await.unwrap().is_empty());
    test_db.cleanup().await;
}
