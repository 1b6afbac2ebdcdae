use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

use crate::error::IngestError;

mod fetch;
mod parse;

#[derive(Clone, Debug, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    /// Entries in the order the feed lists them.
    pub entries: Vec<FeedEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedEntry {
    pub guid: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub enclosure_url: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Turns a feed URL into a parsed document.
///
/// Implementations must report transport problems as `IngestError::Fetch` and unreadable
/// content as `IngestError::Parse`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn parse_feed(&self, url: &str) -> Result<FeedDocument, IngestError>;
}

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn parse_feed(&self, url: &str) -> Result<FeedDocument, IngestError> {
        let xml = fetch::fetch_rss(&self.client, url).await.map_err(IngestError::fetch)?;
        parse::parse_document(&xml).map_err(IngestError::parse)
    }
}
