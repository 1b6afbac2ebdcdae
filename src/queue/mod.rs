use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod pg;
mod worker;

pub use pg::PgJobQueue;
pub use worker::{JobHandler, Worker};

/// A running job's lease is considered abandoned after this long and may be claimed again.
pub const JOB_LEASE: Duration = Duration::from_secs(600);
/// Handlers are cut off this long before their lease runs out.
const LEASE_MARGIN: Duration = Duration::from_secs(60);
pub const HANDLE_TIMEOUT: Duration = JOB_LEASE.saturating_sub(LEASE_MARGIN);
const MAX_BACKOFF: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue storage error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("job payload encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub remove_on_complete: bool,
    pub remove_on_fail: bool,
    /// Total deliveries allowed, including the first one.
    pub attempts: i32,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self { remove_on_complete: false, remove_on_fail: false, attempts: 1 }
    }
}

impl JobOptions {
    /// Fire-and-forget: one attempt, nothing retained afterwards.
    pub fn ephemeral() -> Self {
        Self { remove_on_complete: true, remove_on_fail: true, attempts: 1 }
    }

    pub fn with_attempts(attempts: i32) -> Self {
        Self { attempts: attempts.max(1), ..Self::default() }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ClaimedJob {
    pub job_id: i64,
    pub queue: String,
    pub payload: sqlx::types::Json<serde_json::Value>,
    /// Deliveries so far, including the current one.
    pub attempts: i32,
    pub max_attempts: i32,
    pub remove_on_complete: bool,
    pub remove_on_fail: bool,
}

/// Where a worker gets deliveries from and reports their settlement to.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &str;

    async fn claim(&self, worker_id: &str) -> Result<Option<ClaimedJob>, QueueError>;

    async fn apply(&self, job_id: i64, settlement: &Settlement) -> Result<(), QueueError>;
}

/// What to do with a job once its handler returned.
#[derive(Clone, Debug, PartialEq)]
pub enum Settlement {
    Remove,
    Complete,
    Retry { delay: Duration, error: String },
    Fail { error: String },
}

pub fn settle(job: &ClaimedJob, outcome: Result<(), String>, backoff: Duration) -> Settlement {
    match outcome {
        Ok(()) if job.remove_on_complete => Settlement::Remove,
        Ok(()) => Settlement::Complete,
        Err(error) if job.attempts < job.max_attempts => {
            Settlement::Retry { delay: retry_delay(backoff, job.attempts), error }
        }
        Err(_) if job.remove_on_fail => Settlement::Remove,
        Err(error) => Settlement::Fail { error },
    }
}

fn retry_delay(base: Duration, attempts: i32) -> Duration {
    let exp = attempts.saturating_sub(1).clamp(0, 16) as u32;
    base.saturating_mul(2u32.saturating_pow(exp)).min(MAX_BACKOFF)
}
