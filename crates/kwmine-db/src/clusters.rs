//! Cluster output repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use kwmine_core::{
    ClusterStore, ClusterSummary, ClusteredKeywordRow, Error, PlaceClusters, PlaceId, Result,
};

/// PostgreSQL implementation of ClusterStore.
#[derive(Clone)]
pub struct PgClusterRepository {
    pool: Pool<Postgres>,
}

impl PgClusterRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert rows and summaries of one place within an existing transaction.
    pub async fn write_place_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        clusters: &PlaceClusters,
    ) -> Result<()> {
        if !clusters.rows.is_empty() {
            let place_ids: Vec<i64> = clusters.rows.iter().map(|r| r.place_id).collect();
            let cluster_ids: Vec<i32> = clusters.rows.iter().map(|r| r.cluster_id).collect();
            let keywords: Vec<&str> = clusters.rows.iter().map(|r| r.keyword.as_str()).collect();
            let counts: Vec<i64> = clusters.rows.iter().map(|r| r.count).collect();

            sqlx::query(
                "INSERT INTO clustered_keywords (place_id, cluster_id, keyword, count)
                 SELECT * FROM UNNEST($1::bigint[], $2::int[], $3::text[], $4::bigint[])",
            )
            .bind(&place_ids)
            .bind(&cluster_ids)
            .bind(&keywords)
            .bind(&counts)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }

        if !clusters.summaries.is_empty() {
            let place_ids: Vec<i64> = clusters.summaries.iter().map(|s| s.place_id).collect();
            let cluster_ids: Vec<i32> = clusters.summaries.iter().map(|s| s.cluster_id).collect();
            let representatives: Vec<&str> = clusters
                .summaries
                .iter()
                .map(|s| s.representative_keyword.as_str())
                .collect();
            let counts: Vec<i64> = clusters.summaries.iter().map(|s| s.keyword_count).collect();

            sqlx::query(
                "INSERT INTO cluster_summaries
                     (place_id, cluster_id, representative_keyword, keyword_count)
                 SELECT * FROM UNNEST($1::bigint[], $2::int[], $3::text[], $4::bigint[])",
            )
            .bind(&place_ids)
            .bind(&cluster_ids)
            .bind(&representatives)
            .bind(&counts)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterStore for PgClusterRepository {
    async fn reset(&self) -> Result<()> {
        sqlx::query("TRUNCATE clustered_keywords, cluster_summaries RESTART IDENTITY")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        debug!(subsystem = "db", component = "clusters", op = "reset", "Cluster tables reset");
        Ok(())
    }

    async fn write_place(&self, place_id: PlaceId, clusters: &PlaceClusters) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.write_place_tx(&mut tx, clusters).await?;
        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "db",
            component = "clusters",
            op = "write_place",
            place_id,
            rows = clusters.rows.len(),
            summaries = clusters.summaries.len(),
            "Place clusters written"
        );
        Ok(())
    }

    async fn rows_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusteredKeywordRow>> {
        let rows = sqlx::query(
            "SELECT place_id, cluster_id, keyword, count FROM clustered_keywords
             WHERE place_id = $1 ORDER BY cluster_id, keyword",
        )
        .bind(place_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| ClusteredKeywordRow {
                place_id: r.get("place_id"),
                cluster_id: r.get("cluster_id"),
                keyword: r.get("keyword"),
                count: r.get("count"),
            })
            .collect())
    }

    async fn summaries_for_place(&self, place_id: PlaceId) -> Result<Vec<ClusterSummary>> {
        let rows = sqlx::query(
            "SELECT place_id, cluster_id, representative_keyword, keyword_count
             FROM cluster_summaries WHERE place_id = $1 ORDER BY cluster_id",
        )
        .bind(place_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| ClusterSummary {
                place_id: r.get("place_id"),
                cluster_id: r.get("cluster_id"),
                representative_keyword: r.get("representative_keyword"),
                keyword_count: r.get("keyword_count"),
            })
            .collect())
    }
}
