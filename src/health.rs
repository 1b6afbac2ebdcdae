use chrono::{DateTime, Utc};

use crate::model::{Podcast, PodcastUpdate};
use crate::store::Store;

/// Success resets the failure streak and records the stored episode count.
pub fn success_update(post_count: i64, now: DateTime<Utc>) -> PodcastUpdate {
    PodcastUpdate { post_count: Some(post_count), consecutive_scrape_failures: 0, last_scraped_at: now }
}

/// Failure extends the streak by one and leaves `post_count` alone.
pub fn failure_update(podcast: &Podcast, now: DateTime<Utc>) -> PodcastUpdate {
    PodcastUpdate {
        post_count: None,
        consecutive_scrape_failures: podcast.consecutive_scrape_failures.saturating_add(1),
        last_scraped_at: now,
    }
}

pub async fn record_success(store: &dyn Store, podcast: &Podcast) -> Result<i64, sqlx::Error> {
    let post_count = store.count_episodes(podcast.podcast_id).await?;
    store.update_podcast(podcast.podcast_id, &success_update(post_count, Utc::now())).await?;
    Ok(post_count)
}

/// Returns the new failure count.
pub async fn record_failure(store: &dyn Store, podcast: &Podcast) -> Result<i32, sqlx::Error> {
    // re-read so a stale snapshot never undercounts
    let current = store.get_podcast(podcast.podcast_id).await?.unwrap_or_else(|| podcast.clone());
    let update = failure_update(&current, Utc::now());
    store.update_podcast(podcast.podcast_id, &update).await?;
    Ok(update.consecutive_scrape_failures)
}
