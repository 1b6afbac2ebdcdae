use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Episode, PodcastId};

mod http;

pub use http::{ActivityError, HttpActivityClient};

/// Activity-feed writes accept at most this many activities per call.
pub const BATCH_SIZE: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Activity {
    pub actor: String,
    pub verb: &'static str,
    pub object: String,
    pub foreign_id: String,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Activity {
    pub fn for_episode(ep: &Episode, now: DateTime<Utc>) -> Self {
        let object = format!("episodes:{}", ep.episode_id);
        Self {
            actor: format!("podcasts:{}", ep.podcast_id),
            verb: "podcast_episode",
            foreign_id: object.clone(),
            object,
            time: ep.published_at.unwrap_or(now),
            title: ep.title.clone(),
            link: ep.link.clone(),
        }
    }
}

pub fn feed_key(podcast_id: PodcastId) -> String {
    format!("podcast:{podcast_id}")
}

/// Append-only remote timeline.
#[async_trait]
pub trait ActivityClient: Send + Sync {
    async fn add_activities(&self, feed_key: &str, activities: &[Activity]) -> Result<(), ActivityError>;
}

/// A batch was rejected; everything before it was accepted.
#[derive(Debug, thiserror::Error)]
#[error("batch {} rejected after {episodes_sent} activities were accepted: {source}", .batches_sent + 1)]
pub struct PublishFailure {
    pub batches_sent: usize,
    /// Length of the accepted prefix of the input.
    pub episodes_sent: usize,
    #[source]
    pub source: ActivityError,
}

/// Publishes `episodes` in consecutive batches of at most `batch_size`, stopping at the first failure.
///
/// Returns the number of batches sent.
pub async fn publish_episodes(
    client: &dyn ActivityClient,
    feed_key: &str,
    episodes: &[&Episode],
    batch_size: usize,
) -> Result<usize, PublishFailure> {
    let now = Utc::now();
    let mut batches_sent = 0usize;
    let mut episodes_sent = 0usize;
    for batch in episodes.chunks(batch_size.max(1)) {
        let activities: Vec<Activity> = batch.iter().map(|ep| Activity::for_episode(ep, now)).collect();
        if let Err(source) = client.add_activities(feed_key, &activities).await {
            return Err(PublishFailure { batches_sent, episodes_sent, source });
        }
        batches_sent += 1;
        episodes_sent += batch.len();
        tracing::debug!(feed_key, batch = batches_sent, size = activities.len(), "activity batch published");
    }
    Ok(batches_sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{episode, RecordingActivityClient};

    #[tokio::test]
    async fn splits_into_ordered_batches() {
        let client = RecordingActivityClient::new();
        let eps: Vec<Episode> = (1..=250).map(|i| episode(i, 9)).collect();
        let refs: Vec<&Episode> = eps.iter().collect();

        let sent = publish_episodes(&client, "podcast:9", &refs, BATCH_SIZE).await.unwrap();
        assert_eq!(sent, 3);

        let calls = client.calls();
        let sizes: Vec<usize> = calls.iter().map(|(_, batch)| batch.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert!(calls.iter().all(|(key, _)| key == "podcast:9"));

        let ids: Vec<String> = calls.into_iter().flat_map(|(_, b)| b.into_iter().map(|a| a.foreign_id)).collect();
        let expected: Vec<String> = (1..=250).map(|i| format!("episodes:{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn stops_at_first_failed_batch() {
        let client = RecordingActivityClient::new();
        client.fail_on_call(2);
        let eps: Vec<Episode> = (1..=350).map(|i| episode(i, 9)).collect();
        let refs: Vec<&Episode> = eps.iter().collect();

        let err = publish_episodes(&client, "podcast:9", &refs, BATCH_SIZE).await.unwrap_err();
        assert_eq!((err.batches_sent, err.episodes_sent), (1, 100));
        assert_eq!(client.calls().len(), 1);
        // batches 3 and 4 were never attempted
        assert_eq!(client.attempts(), 2);
    }

    #[tokio::test]
    async fn no_episodes_means_no_calls() {
        let client = RecordingActivityClient::new();
        assert_eq!(publish_episodes(&client, "podcast:9", &[], BATCH_SIZE).await.unwrap(), 0);
        assert!(client.calls().is_empty());
    }

    #[test]
    fn activity_carries_episode_foreign_id() {
        let ep = episode(42, 3);
        let a = Activity::for_episode(&ep, Utc::now());
        assert_eq!(a.foreign_id, "episodes:42");
        assert_eq!(a.object, "episodes:42");
        assert_eq!(a.actor, "podcasts:3");
        assert_eq!(feed_key(3), "podcast:3");
    }
}
