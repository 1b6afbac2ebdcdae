use async_trait::async_trait;

use crate::model::{Episode, EpisodeId, NewEpisode, Podcast, PodcastId, PodcastUpdate};

mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// Podcast/episode persistence with upsert-by-`(podcast_id, guid)` semantics.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>, sqlx::Error>;

    async fn update_podcast(&self, id: PodcastId, update: &PodcastUpdate) -> Result<(), sqlx::Error>;

    async fn find_episodes_by_podcast(&self, id: PodcastId) -> Result<Vec<Episode>, sqlx::Error>;

    /// Inserts or refreshes each episode and returns only the newly created rows, in input order.
    ///
    /// Refreshing an existing row never touches its id or its pending flags.
    async fn upsert_episodes(&self, episodes: &[NewEpisode]) -> Result<Vec<Episode>, sqlx::Error>;

    async fn count_episodes(&self, id: PodcastId) -> Result<i64, sqlx::Error>;

    /// Clears `publish_pending` once the activity feed accepted these episodes.
    async fn mark_published(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error>;

    /// Clears `enrich_pending` once an enrichment job was accepted, or none is owed.
    async fn mark_enriched(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error>;
}
