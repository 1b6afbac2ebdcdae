//! Test doubles for the pipeline seams.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::activity::{Activity, ActivityClient, ActivityError};
use crate::enrich::EnrichmentQueue;
use crate::error::IngestError;
use crate::feed::{FeedDocument, FeedEntry, FeedSource};
use crate::model::{EnrichmentJob, Episode, EpisodeId, PodcastId};
use crate::queue::{JobOptions, QueueError};

pub fn episode(id: EpisodeId, podcast_id: PodcastId) -> Episode {
    Episode {
        episode_id: id,
        podcast_id,
        guid: format!("guid-{id}"),
        title: Some(format!("Episode {id}")),
        link: Some(format!("https://example.com/episodes/{id}")),
        enclosure_url: None,
        description: None,
        published_at: None,
        publish_pending: true,
        enrich_pending: true,
    }
}

/// A feed of `n` entries, newest (highest number) first as podcasts usually list them.
pub fn feed_of(n: usize) -> FeedDocument {
    let entries = (1..=n)
        .rev()
        .map(|i| FeedEntry {
            guid: format!("item-{i}"),
            title: Some(format!("Item {i}")),
            link: Some(format!("https://example.com/items/{i}")),
            enclosure_url: Some(format!("https://cdn.example.com/{i}.mp3")),
            description: None,
            published_at: None,
        })
        .collect();
    FeedDocument { title: Some("Test Feed".into()), entries }
}

enum StubResponse {
    Doc(FeedDocument),
    Malformed,
}

/// Serves canned documents by URL; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct StubFeedSource {
    responses: Mutex<HashMap<String, StubResponse>>,
    calls: Mutex<Vec<String>>,
}

impl StubFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, doc: FeedDocument) {
        self.responses.lock().unwrap().insert(url.to_string(), StubResponse::Doc(doc));
    }

    pub fn serve_malformed(&self, url: &str) {
        self.responses.lock().unwrap().insert(url.to_string(), StubResponse::Malformed);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for StubFeedSource {
    async fn parse_feed(&self, url: &str) -> Result<FeedDocument, IngestError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.responses.lock().unwrap().get(url) {
            Some(StubResponse::Doc(doc)) => Ok(doc.clone()),
            Some(StubResponse::Malformed) => Err(IngestError::parse("unexpected root element <html>")),
            None => Err(IngestError::fetch(format!("error sending request for url ({url}): dns error"))),
        }
    }
}

/// Records every batch; `fail_on_call(n)` makes the n-th call (1-based) fail once.
#[derive(Default)]
pub struct RecordingActivityClient {
    calls: Mutex<Vec<(String, Vec<Activity>)>>,
    attempts: Mutex<usize>,
    fail_on: Mutex<Option<usize>>,
}

impl RecordingActivityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_call(&self, n: usize) {
        *self.fail_on.lock().unwrap() = Some(n);
    }

    /// Successful calls only.
    pub fn calls(&self) -> Vec<(String, Vec<Activity>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Every call, failed ones included.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn foreign_ids(&self) -> Vec<String> {
        self.calls().into_iter().flat_map(|(_, b)| b.into_iter().map(|a| a.foreign_id)).collect()
    }
}

#[async_trait]
impl ActivityClient for RecordingActivityClient {
    async fn add_activities(&self, feed_key: &str, activities: &[Activity]) -> Result<(), ActivityError> {
        let attempt = {
            let mut n = self.attempts.lock().unwrap();
            *n += 1;
            *n
        };
        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(attempt) {
            *fail_on = None;
            return Err(ActivityError::Api { status: reqwest::StatusCode::SERVICE_UNAVAILABLE, body: "try later".into() });
        }
        self.calls.lock().unwrap().push((feed_key.to_string(), activities.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEnrichmentQueue {
    jobs: Mutex<Vec<(EnrichmentJob, JobOptions)>>,
    attempts: Mutex<usize>,
    fail_on: Mutex<Option<usize>>,
}

impl RecordingEnrichmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_call(&self, n: usize) {
        *self.fail_on.lock().unwrap() = Some(n);
    }

    /// Accepted jobs only.
    pub fn jobs(&self) -> Vec<(EnrichmentJob, JobOptions)> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl EnrichmentQueue for RecordingEnrichmentQueue {
    async fn add(&self, job: &EnrichmentJob, opts: &JobOptions) -> Result<(), QueueError> {
        let attempt = {
            let mut n = self.attempts.lock().unwrap();
            *n += 1;
            *n
        };
        let mut fail_on = self.fail_on.lock().unwrap();
        if *fail_on == Some(attempt) {
            *fail_on = None;
            return Err(QueueError::Db(sqlx::Error::PoolTimedOut));
        }
        self.jobs.lock().unwrap().push((job.clone(), opts.clone()));
        Ok(())
    }
}
