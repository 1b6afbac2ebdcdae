use async_trait::async_trait;

use crate::model::{EnrichmentJob, Episode, EpisodeId};
use crate::queue::{JobOptions, PgJobQueue, QueueError};

/// Secondary queue that receives one enrichment job per new episode.
#[async_trait]
pub trait EnrichmentQueue: Send + Sync {
    async fn add(&self, job: &EnrichmentJob, opts: &JobOptions) -> Result<(), QueueError>;
}

#[async_trait]
impl EnrichmentQueue for PgJobQueue {
    async fn add(&self, job: &EnrichmentJob, opts: &JobOptions) -> Result<(), QueueError> {
        self.enqueue(job, opts).await.map(|_| ())
    }
}

/// Episodes no longer owed an enrichment job after one scheduling pass.
#[derive(Debug, Default, PartialEq)]
pub struct Scheduled {
    pub enqueued: usize,
    /// Accepted jobs plus episodes with nothing to enrich.
    pub settled: Vec<EpisodeId>,
}

#[derive(Debug, thiserror::Error)]
#[error("{failed} of {attempted} enrichment jobs could not be enqueued (first error: {first})")]
pub struct ScheduleFailures {
    pub attempted: usize,
    pub failed: usize,
    pub settled: Vec<EpisodeId>,
    #[source]
    pub first: QueueError,
}

/// Enqueues one job per episode, in order.
///
/// A failed submission does not stop the rest; any failure is reported once all were tried.
/// Episodes without a link have nothing to enrich and are skipped.
pub async fn schedule_enrichment(queue: &dyn EnrichmentQueue, episodes: &[&Episode]) -> Result<Scheduled, ScheduleFailures> {
    // the worker's own retry replaces queue-level retry for these jobs
    let opts = JobOptions::ephemeral();
    let mut done = Scheduled::default();
    let mut attempted = 0usize;
    let mut failed = 0usize;
    let mut first: Option<QueueError> = None;

    for ep in episodes {
        let Some(link) = ep.link.as_deref() else {
            tracing::warn!(episode_id = ep.episode_id, "episode has no link, skipping enrichment");
            done.settled.push(ep.episode_id);
            continue;
        };
        attempted += 1;
        match queue.add(&EnrichmentJob::episode(link), &opts).await {
            Ok(()) => {
                done.enqueued += 1;
                done.settled.push(ep.episode_id);
            }
            Err(e) => {
                tracing::warn!(episode_id = ep.episode_id, error = %e, "enrichment enqueue failed");
                failed += 1;
                first.get_or_insert(e);
            }
        }
    }

    match first {
        Some(first) => Err(ScheduleFailures { attempted, failed, settled: done.settled, first }),
        None => Ok(done),
    }
}
