//! Job repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use kwmine_core::{Error, JobKind, JobRepository, JobStatus, KeywordJob, Result};

const JOB_COLUMNS: &str = "id, kind, status, progress_percent, progress_stage, result, \
                           error_message, created_at, started_at, completed_at";

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_job_row(row: sqlx::postgres::PgRow) -> Result<KeywordJob> {
        let kind: String = row.get("kind");
        let status: String = row.get("status");
        Ok(KeywordJob {
            id: row.get("id"),
            kind: kind.parse::<JobKind>().map_err(Error::Internal)?,
            status: status.parse::<JobStatus>().map_err(Error::Internal)?,
            progress_percent: row.get("progress_percent"),
            progress_stage: row.get("progress_stage"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn create(&self, kind: JobKind) -> Result<Uuid> {
        let job_id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO keyword_jobs (id, kind, status, created_at)
             VALUES ($1, $2, 'pending', $3)",
        )
        .bind(job_id)
        .bind(kind.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<KeywordJob>> {
        // SKIP LOCKED lets several workers poll the same table.
        let query = format!(
            "UPDATE keyword_jobs
             SET status = 'running', started_at = $1
             WHERE id = (
                 SELECT id FROM keyword_jobs
                 WHERE status = 'pending'
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        stage: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE keyword_jobs SET progress_percent = $1, progress_stage = $2 WHERE id = $3",
        )
        .bind(percent.clamp(0, 100))
        .bind(stage)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE keyword_jobs
             SET status = 'completed', completed_at = $1, result = $2, progress_percent = 100
             WHERE id = $3",
        )
        .bind(Utc::now())
        .bind(&result)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("job {}", job_id)));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE keyword_jobs
             SET status = 'failed', completed_at = $1, error_message = $2
             WHERE id = $3",
        )
        .bind(Utc::now())
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("job {}", job_id)));
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<KeywordJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM keyword_jobs WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(Self::parse_job_row).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<KeywordJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM keyword_jobs ORDER BY created_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.into_iter().map(Self::parse_job_row).collect()
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM keyword_jobs WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count.0)
    }
}
