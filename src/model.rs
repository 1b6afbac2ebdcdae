use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PodcastId = i64;
pub type EpisodeId = i64;

#[derive(Clone, Debug, PartialEq, sqlx::FromRow, Serialize)]
pub struct Podcast {
    pub podcast_id: PodcastId,
    pub feed_url: String,
    pub title: Option<String>,
    pub post_count: i64,
    pub consecutive_scrape_failures: i32,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Episode {
    pub episode_id: EpisodeId,
    pub podcast_id: PodcastId,
    /// Feed-provided dedup key: item GUID, else the item link.
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub enclosure_url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// No activity has been accepted for this episode yet.
    pub publish_pending: bool,
    /// No enrichment job has been accepted for this episode yet.
    pub enrich_pending: bool,
}

impl Episode {
    pub fn is_owed(&self) -> bool {
        self.publish_pending || self.enrich_pending
    }
}

/// Episode fields as derived from a feed entry, before the store assigns an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewEpisode {
    pub podcast_id: PodcastId,
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub enclosure_url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewEpisode {
    /// True when the stored row carries different feed metadata.
    pub fn differs_from(&self, stored: &Episode) -> bool {
        self.title != stored.title
            || self.link != stored.link
            || self.enclosure_url != stored.enclosure_url
            || self.description != stored.description
            // a missing date never clears the stored one
            || (self.published_at.is_some() && self.published_at != stored.published_at)
    }
}

/// Fields written back to a podcast at the end of an ingestion attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct PodcastUpdate {
    /// `None` leaves the stored count untouched.
    pub post_count: Option<i64>,
    pub consecutive_scrape_failures: i32,
    pub last_scraped_at: DateTime<Utc>,
}

/// Payload of a scrape job as delivered by the queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub podcast: PodcastId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentJob {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl EnrichmentJob {
    pub fn episode(url: impl Into<String>) -> Self {
        Self { kind: "episode".to_string(), url: url.into() }
    }
}
