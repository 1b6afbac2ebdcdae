use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::Instrument;
use url::Url;

use crate::activity::{self, ActivityClient};
use crate::enrich::{self, EnrichmentQueue};
use crate::error::IngestError;
use crate::feed::FeedSource;
use crate::health;
use crate::model::{Episode, EpisodeId, Podcast, ScrapeJob};
use crate::queue::JobHandler;
use crate::reconcile;
use crate::store::Store;
use crate::telemetry;
use crate::telemetry::ops::ingest::Phase as IngestPhase;

pub mod types;

pub use types::IngestOutcome;

/// Scrape job handler: fetch, reconcile, persist, fan out, record health.
///
/// Callers must not run two ingestions of the same podcast at once; retries are made safe by
/// the store's upsert-by-guid, not by locking.
pub struct Ingestor {
    store: Arc<dyn Store>,
    feeds: Arc<dyn FeedSource>,
    activities: Arc<dyn ActivityClient>,
    enrichment: Arc<dyn EnrichmentQueue>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store>,
        feeds: Arc<dyn FeedSource>,
        activities: Arc<dyn ActivityClient>,
        enrichment: Arc<dyn EnrichmentQueue>,
    ) -> Self {
        Self { store, feeds, activities, enrichment, batch_size: activity::BATCH_SIZE }
    }

    pub async fn ingest(&self, job: ScrapeJob) -> Result<IngestOutcome, IngestError> {
        let log = telemetry::ingest();
        let span = log.root_span_kv([("podcast", job.podcast.to_string()), ("url", format!("{:?}", job.url))]);

        async move {
            let podcast = self
                .store
                .get_podcast(job.podcast)
                .await
                .map_err(IngestError::persistence)?
                .ok_or_else(|| IngestError::validation(format!("unknown podcast {}", job.podcast)))?;

            match self.run_stages(&podcast, job.url.as_deref()).await {
                Ok(mut outcome) => {
                    outcome.post_count = health::record_success(self.store.as_ref(), &podcast)
                        .instrument(log.span(&IngestPhase::Health))
                        .await
                        .map_err(IngestError::persistence)?;
                    log.ingest_summary(podcast.podcast_id, outcome.created, outcome.refreshed, outcome.replayed, outcome.batches, outcome.post_count);
                    Ok(outcome)
                }
                Err(err) => {
                    let failures = match health::record_failure(self.store.as_ref(), &podcast).instrument(log.span(&IngestPhase::Health)).await {
                        Ok(n) => Some(n),
                        Err(e) => {
                            log.error_kv("could not record scrape failure", [("podcast", podcast.podcast_id.to_string()), ("error", e.to_string())]);
                            None
                        }
                    };
                    log.ingest_failed(podcast.podcast_id, &err, failures);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, podcast: &Podcast, url: Option<&str>) -> Result<IngestOutcome, IngestError> {
        let log = telemetry::ingest();

        let url = log.span(&IngestPhase::Validate).in_scope(|| validate_url(url))?;
        let doc = self.feeds.parse_feed(url.as_str()).instrument(log.span(&IngestPhase::Fetch)).await?;

        let stored = self
            .store
            .find_episodes_by_podcast(podcast.podcast_id)
            .instrument(log.span(&IngestPhase::Reconcile))
            .await
            .map_err(IngestError::persistence)?;
        let plan = log
            .span(&IngestPhase::Reconcile)
            .in_scope(|| reconcile::reconcile(podcast.podcast_id, &doc, &reconcile::index_by_guid(&stored)));

        let (created, current) = if plan.is_empty() {
            (Vec::new(), stored)
        } else {
            async {
                let created = self.store.upsert_episodes(&plan.upserts()).await?;
                // fan out what the store now holds, refreshed metadata included
                let current = self.store.find_episodes_by_podcast(podcast.podcast_id).await?;
                Ok::<_, sqlx::Error>((created, current))
            }
            .instrument(log.span(&IngestPhase::Persist))
            .await
            .map_err(IngestError::persistence)?
        };

        let fanout = reconcile::owed_fanout(&doc, &current);
        let created_ids: HashSet<EpisodeId> = created.iter().map(|e| e.episode_id).collect();

        let mut outcome = IngestOutcome {
            podcast_id: podcast.podcast_id,
            created: created.len(),
            refreshed: plan.to_refresh.len(),
            replayed: fanout.iter().filter(|e| !created_ids.contains(&e.episode_id)).count(),
            ..IngestOutcome::default()
        };
        if fanout.is_empty() {
            log.debug(format!("podcast {} owes no fan-out", podcast.podcast_id));
            return Ok(outcome);
        }

        // activities first: a failed publish must not leave enrichment jobs behind
        let to_publish: Vec<&Episode> = fanout.iter().copied().filter(|e| e.publish_pending).collect();
        if !to_publish.is_empty() {
            let feed_key = activity::feed_key(podcast.podcast_id);
            match activity::publish_episodes(self.activities.as_ref(), &feed_key, &to_publish, self.batch_size)
                .instrument(log.span(&IngestPhase::Publish))
                .await
            {
                Ok(batches) => {
                    outcome.batches = batches;
                    self.store.mark_published(&ids_of(&to_publish)).await.map_err(IngestError::persistence)?;
                }
                Err(failure) => {
                    let accepted = ids_of(&to_publish[..failure.episodes_sent]);
                    if let Err(e) = self.store.mark_published(&accepted).await {
                        log.warn(format!("could not record {} published activities: {e}", accepted.len()));
                    }
                    return Err(IngestError::publish(failure));
                }
            }
        }

        let to_enrich: Vec<&Episode> = fanout.iter().copied().filter(|e| e.enrich_pending).collect();
        match enrich::schedule_enrichment(self.enrichment.as_ref(), &to_enrich)
            .instrument(log.span(&IngestPhase::Schedule))
            .await
        {
            Ok(scheduled) => {
                outcome.enrichment_jobs = scheduled.enqueued;
                self.store.mark_enriched(&scheduled.settled).await.map_err(IngestError::persistence)?;
            }
            Err(failures) => {
                if let Err(e) = self.store.mark_enriched(&failures.settled).await {
                    log.warn(format!("could not record {} enqueued enrichment jobs: {e}", failures.settled.len()));
                }
                return Err(IngestError::schedule(failures));
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl JobHandler for Ingestor {
    type Payload = ScrapeJob;
    type Error = IngestError;

    async fn handle(&self, payload: ScrapeJob) -> Result<(), IngestError> {
        self.ingest(payload).await.map(|_| ())
    }
}

fn validate_url(url: Option<&str>) -> Result<Url, IngestError> {
    let raw = url.ok_or_else(|| IngestError::validation("job has no feed url"))?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IngestError::validation("feed url is empty"));
    }
    let parsed = Url::parse(raw).map_err(|e| IngestError::validation(format!("invalid feed url {raw:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(IngestError::validation(format!("unsupported feed url {raw:?}"))),
    }
}

fn ids_of(episodes: &[&Episode]) -> Vec<EpisodeId> {
    episodes.iter().map(|e| e.episode_id).collect()
}
