use std::collections::{HashMap, HashSet};

use crate::feed::{FeedDocument, FeedEntry};
use crate::model::{Episode, NewEpisode, PodcastId};

/// Upserts derived from one feed fetch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Entries with no stored episode, in feed order.
    pub to_create: Vec<NewEpisode>,
    /// Stored episodes whose feed metadata changed.
    pub to_refresh: Vec<NewEpisode>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_refresh.is_empty()
    }

    /// Everything to hand to the store, creations first.
    pub fn upserts(&self) -> Vec<NewEpisode> {
        self.to_create.iter().chain(self.to_refresh.iter()).cloned().collect()
    }
}

pub fn index_by_guid(stored: &[Episode]) -> HashMap<&str, &Episode> {
    stored.iter().map(|e| (e.guid.as_str(), e)).collect()
}

pub fn reconcile(podcast_id: PodcastId, doc: &FeedDocument, stored: &HashMap<&str, &Episode>) -> Reconciliation {
    let mut out = Reconciliation::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for entry in &doc.entries {
        // first occurrence of a guid wins
        if !seen.insert(entry.guid.as_str()) { continue; }
        let candidate = to_new_episode(podcast_id, entry);
        match stored.get(entry.guid.as_str()) {
            None => out.to_create.push(candidate),
            Some(existing) if candidate.differs_from(existing) => out.to_refresh.push(candidate),
            Some(_) => {}
        }
    }
    out
}

fn to_new_episode(podcast_id: PodcastId, entry: &FeedEntry) -> NewEpisode {
    NewEpisode {
        podcast_id,
        guid: entry.guid.clone(),
        title: entry.title.clone(),
        link: entry.link.clone(),
        enclosure_url: entry.enclosure_url.clone(),
        description: entry.description.clone(),
        published_at: entry.published_at,
    }
}

/// Every stored episode still owed an activity or an enrichment job.
///
/// Episodes the feed lists come first, in feed order; ones that fell out of the feed follow by id.
pub fn owed_fanout<'a>(doc: &FeedDocument, stored: &'a [Episode]) -> Vec<&'a Episode> {
    let mut owed: HashMap<&str, &'a Episode> =
        stored.iter().filter(|e| e.is_owed()).map(|e| (e.guid.as_str(), e)).collect();

    let mut out: Vec<&'a Episode> = doc.entries.iter().filter_map(|entry| owed.remove(entry.guid.as_str())).collect();
    let mut unlisted: Vec<&'a Episode> = owed.into_values().collect();
    unlisted.sort_by_key(|e| e.episode_id);
    out.extend(unlisted);
    out
}
