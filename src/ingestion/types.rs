use serde::Serialize;

use crate::model::PodcastId;

/// What one successful ingestion pass did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub podcast_id: PodcastId,
    pub created: usize,
    pub refreshed: usize,
    /// Episodes from an earlier pass whose fan-out was completed by this one.
    pub replayed: usize,
    pub batches: usize,
    pub enrichment_jobs: usize,
    pub post_count: i64,
}
