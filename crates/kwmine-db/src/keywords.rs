//! Keyword count repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use kwmine_core::{Error, KeywordCount, KeywordCountRun, KeywordStore, PlaceId, Result};

/// PostgreSQL implementation of KeywordStore.
#[derive(Clone)]
pub struct PgKeywordRepository {
    pool: Pool<Postgres>,
}

impl PgKeywordRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Stored counts of one place, ordered by row id.
    pub async fn counts_for_place(&self, place_id: PlaceId) -> Result<Vec<KeywordCount>> {
        let rows = sqlx::query(
            "SELECT place_id, keyword, count FROM keywords WHERE place_id = $1 ORDER BY id",
        )
        .bind(place_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.into_iter().map(parse_count_row).collect())
    }
}

fn parse_count_row(row: sqlx::postgres::PgRow) -> KeywordCount {
    KeywordCount {
        place_id: row.get("place_id"),
        keyword: row.get("keyword"),
        count: row.get("count"),
    }
}

/// Merge duplicate `(place_id, keyword)` entries, keeping first-seen order.
///
/// A single `INSERT .. ON CONFLICT DO UPDATE` cannot touch the same row twice.
fn merge_duplicates(counts: &[KeywordCount]) -> Vec<KeywordCount> {
    let mut merged: Vec<KeywordCount> = Vec::with_capacity(counts.len());
    let mut index: HashMap<(PlaceId, &str), usize> = HashMap::with_capacity(counts.len());
    for count in counts {
        match index.get(&(count.place_id, count.keyword.as_str())) {
            Some(&i) => merged[i].count += count.count,
            None => {
                index.insert((count.place_id, count.keyword.as_str()), merged.len());
                merged.push(count.clone());
            }
        }
    }
    merged
}

/// Extraction run holding an open transaction.
pub struct PgKeywordCountRun {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl KeywordCountRun for PgKeywordCountRun {
    async fn upsert_counts(&mut self, counts: &[KeywordCount]) -> Result<u64> {
        if counts.is_empty() {
            return Ok(0);
        }
        let merged = merge_duplicates(counts);
        let place_ids: Vec<i64> = merged.iter().map(|c| c.place_id).collect();
        let keywords: Vec<&str> = merged.iter().map(|c| c.keyword.as_str()).collect();
        let increments: Vec<i64> = merged.iter().map(|c| c.count).collect();

        let result = sqlx::query(
            "INSERT INTO keywords (place_id, keyword, count)
             SELECT * FROM UNNEST($1::bigint[], $2::text[], $3::bigint[])
             ON CONFLICT (place_id, keyword)
             DO UPDATE SET count = keywords.count + EXCLUDED.count",
        )
        .bind(&place_ids)
        .bind(&keywords)
        .bind(&increments)
        .execute(&mut *self.tx)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let run = *self;
        run.tx.commit().await.map_err(Error::Database)?;
        debug!(subsystem = "db", component = "keywords", op = "commit", "Keyword run committed");
        Ok(())
    }
}

#[async_trait]
impl KeywordStore for PgKeywordRepository {
    async fn begin_run(&self) -> Result<Box<dyn KeywordCountRun>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("TRUNCATE keywords RESTART IDENTITY")
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        debug!(subsystem = "db", component = "keywords", op = "reset", "Keyword table reset");
        Ok(Box::new(PgKeywordCountRun { tx }))
    }

    async fn list_counts(&self) -> Result<Vec<KeywordCount>> {
        let rows = sqlx::query("SELECT place_id, keyword, count FROM keywords ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(parse_count_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kc(place_id: PlaceId, keyword: &str, count: i64) -> KeywordCount {
        KeywordCount {
            place_id,
            keyword: keyword.to_string(),
            count,
        }
    }

    #[test]
    fn test_merge_duplicates_keeps_order() {
        let merged = merge_duplicates(&[
            kc(1, "커피", 1),
            kc(1, "라떼", 2),
            kc(2, "커피", 1),
            kc(1, "커피", 3),
        ]);
        assert_eq!(merged, vec![kc(1, "커피", 4), kc(1, "라떼", 2), kc(2, "커피", 1)]);
    }

    #[test]
    fn test_merge_duplicates_empty() {
        assert!(merge_duplicates(&[]).is_empty());
    }
}
