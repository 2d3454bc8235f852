//! Review repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use kwmine_core::{Error, PlaceId, RawReview, Result, ReviewSource};

/// PostgreSQL implementation of ReviewSource.
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: Pool<Postgres>,
}

impl PgReviewRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a place if it does not exist yet.
    pub async fn upsert_place(&self, place_id: PlaceId, title: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO places (id, title) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET title = COALESCE(EXCLUDED.title, places.title)",
        )
        .bind(place_id)
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Insert a review and return its row id.
    pub async fn insert(&self, review: &RawReview) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO reviews (place_id, content, rating) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(review.place_id)
        .bind(review.text.as_deref())
        .bind(review.rating)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("id"))
    }
}

#[async_trait]
impl ReviewSource for PgReviewRepository {
    async fn list_place_ids(&self) -> Result<Vec<PlaceId>> {
        let rows = sqlx::query("SELECT id FROM places ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(|r| r.get("id")).collect())
    }

    async fn reviews_for_place(&self, place_id: PlaceId) -> Result<Vec<RawReview>> {
        let rows = sqlx::query(
            "SELECT place_id, content, rating FROM reviews WHERE place_id = $1 ORDER BY id",
        )
        .bind(place_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| RawReview {
                place_id: r.get("place_id"),
                text: r.get("content"),
                rating: r.get("rating"),
            })
            .collect())
    }
}
