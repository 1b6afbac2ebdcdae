use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{ClaimedJob, JobOptions, JobSource, QueueError, Settlement, JOB_LEASE};

/// One named queue stored in `podfeed.job`.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    name: String,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        Self { pool, name: name.into() }
    }

    pub async fn enqueue<T: Serialize + Sync>(&self, payload: &T, opts: &JobOptions) -> Result<i64, QueueError> {
        let payload = serde_json::to_value(payload)?;
        let job_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO podfeed.job (queue, payload, max_attempts, remove_on_complete, remove_on_fail)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING job_id
            "#,
        )
        .bind(&self.name)
        .bind(Json(payload))
        .bind(opts.attempts.max(1))
        .bind(opts.remove_on_complete)
        .bind(opts.remove_on_fail)
        .fetch_one(&self.pool)
        .await?;
        Ok(job_id)
    }

}

#[async_trait]
impl JobSource for PgJobQueue {
    fn name(&self) -> &str {
        &self.name
    }

    /// Claims the next due job, or one whose lease expired.
    async fn claim(&self, worker_id: &str) -> Result<Option<ClaimedJob>, QueueError> {
        let lease_cutoff = Utc::now() - chrono::Duration::from_std(JOB_LEASE).unwrap_or_else(|_| chrono::Duration::minutes(10));
        let job = sqlx::query_as::<_, ClaimedJob>(
            r#"
            UPDATE podfeed.job
            SET status = 'running', locked_at = now(), locked_by = $2, attempts = attempts + 1
            WHERE job_id = (
                SELECT job_id FROM podfeed.job
                WHERE queue = $1
                  AND ((status = 'queued' AND run_at <= now())
                       OR (status = 'running' AND locked_at < $3))
                ORDER BY run_at, job_id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING job_id, queue, payload, attempts, max_attempts, remove_on_complete, remove_on_fail
            "#,
        )
        .bind(&self.name)
        .bind(worker_id)
        .bind(lease_cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn apply(&self, job_id: i64, settlement: &Settlement) -> Result<(), QueueError> {
        match settlement {
            Settlement::Remove => {
                sqlx::query("DELETE FROM podfeed.job WHERE job_id = $1")
                    .bind(job_id)
                    .execute(&self.pool)
                    .await?;
            }
            Settlement::Complete => {
                sqlx::query(
                    "UPDATE podfeed.job SET status = 'completed', locked_at = NULL, locked_by = NULL, finished_at = now() WHERE job_id = $1",
                )
                .bind(job_id)
                .execute(&self.pool)
                .await?;
            }
            Settlement::Retry { delay, error } => {
                sqlx::query(
                    r#"
                    UPDATE podfeed.job
                    SET status = 'queued', locked_at = NULL, locked_by = NULL,
                        run_at = now() + make_interval(secs => $2), last_error = $3
                    WHERE job_id = $1
                    "#,
                )
                .bind(job_id)
                .bind(delay.as_secs_f64())
                .bind(error)
                .execute(&self.pool)
                .await?;
            }
            Settlement::Fail { error } => {
                sqlx::query(
                    "UPDATE podfeed.job SET status = 'failed', locked_at = NULL, locked_by = NULL, finished_at = now(), last_error = $2 WHERE job_id = $1",
                )
                .bind(job_id)
                .bind(error)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
