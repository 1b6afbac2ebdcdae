use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::Store;
use crate::model::{Episode, EpisodeId, NewEpisode, Podcast, PodcastId, PodcastUpdate};

#[derive(Default)]
struct State {
    podcasts: HashMap<PodcastId, Podcast>,
    episodes: Vec<Episode>,
    next_episode_id: EpisodeId,
    fail_upserts: bool,
}

/// In-process store used by the pipeline tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_podcast(id: PodcastId, feed_url: &str) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().podcasts.insert(id, Podcast {
            podcast_id: id,
            feed_url: feed_url.to_string(),
            title: None,
            post_count: 0,
            consecutive_scrape_failures: 0,
            last_scraped_at: None,
        });
        store
    }

    pub fn podcast(&self, id: PodcastId) -> Podcast {
        self.state.lock().unwrap().podcasts[&id].clone()
    }

    pub fn episodes(&self) -> Vec<Episode> {
        self.state.lock().unwrap().episodes.clone()
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.state.lock().unwrap().fail_upserts = fail;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_podcast(&self, id: PodcastId) -> Result<Option<Podcast>, sqlx::Error> {
        Ok(self.state.lock().unwrap().podcasts.get(&id).cloned())
    }

    async fn update_podcast(&self, id: PodcastId, update: &PodcastUpdate) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let Some(p) = state.podcasts.get_mut(&id) else { return Err(sqlx::Error::RowNotFound) };
        if let Some(count) = update.post_count { p.post_count = count; }
        p.consecutive_scrape_failures = update.consecutive_scrape_failures;
        p.last_scraped_at = Some(update.last_scraped_at);
        Ok(())
    }

    async fn find_episodes_by_podcast(&self, id: PodcastId) -> Result<Vec<Episode>, sqlx::Error> {
        Ok(self.state.lock().unwrap().episodes.iter().filter(|e| e.podcast_id == id).cloned().collect())
    }

    async fn upsert_episodes(&self, episodes: &[NewEpisode]) -> Result<Vec<Episode>, sqlx::Error> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if state.fail_upserts { return Err(sqlx::Error::PoolTimedOut); }
        let mut created = Vec::new();
        for ep in episodes {
            let existing = state.episodes.iter_mut().find(|e| e.podcast_id == ep.podcast_id && e.guid == ep.guid);
            match existing {
                Some(row) => {
                    row.title = ep.title.clone();
                    row.link = ep.link.clone();
                    row.enclosure_url = ep.enclosure_url.clone();
                    row.description = ep.description.clone();
                    row.published_at = ep.published_at.or(row.published_at);
                }
                None => {
                    state.next_episode_id += 1;
                    let row = Episode {
                        episode_id: state.next_episode_id,
                        podcast_id: ep.podcast_id,
                        guid: ep.guid.clone(),
                        title: ep.title.clone(),
                        link: ep.link.clone(),
                        enclosure_url: ep.enclosure_url.clone(),
                        description: ep.description.clone(),
                        published_at: ep.published_at,
                        publish_pending: true,
                        enrich_pending: true,
                    };
                    state.episodes.push(row.clone());
                    created.push(row);
                }
            }
        }
        Ok(created)
    }

    async fn count_episodes(&self, id: PodcastId) -> Result<i64, sqlx::Error> {
        Ok(self.state.lock().unwrap().episodes.iter().filter(|e| e.podcast_id == id).count() as i64)
    }

    async fn mark_published(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        for e in state.episodes.iter_mut().filter(|e| ids.contains(&e.episode_id)) {
            e.publish_pending = false;
        }
        Ok(())
    }

    async fn mark_enriched(&self, ids: &[EpisodeId]) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        for e in state.episodes.iter_mut().filter(|e| ids.contains(&e.episode_id)) {
            e.enrich_pending = false;
        }
        Ok(())
    }
}
