use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::{Activity, ActivityClient};
use crate::config::ActivityFeedConfig;

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("activity feed returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("invalid feed key: {0}")]
    FeedKey(String),
}

#[derive(Serialize)]
struct AddActivitiesBody<'a> {
    activities: &'a [Activity],
}

/// Client for a Stream-style `POST /feed/{slug}/{id}/` endpoint.
#[derive(Clone)]
pub struct HttpActivityClient {
    http: Client,
    cfg: ActivityFeedConfig,
}

impl HttpActivityClient {
    pub fn new(cfg: ActivityFeedConfig) -> Result<Self, ActivityError> {
        let http = Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, feed_key: &str) -> Result<String, ActivityError> {
        let (slug, id) = feed_key
            .split_once(':')
            .filter(|(s, i)| !s.is_empty() && !i.is_empty())
            .ok_or_else(|| ActivityError::FeedKey(feed_key.to_string()))?;
        Ok(format!("{}/feed/{}/{}/", self.cfg.base_url.trim_end_matches('/'), slug, id))
    }
}

#[async_trait]
impl ActivityClient for HttpActivityClient {
    async fn add_activities(&self, feed_key: &str, activities: &[Activity]) -> Result<(), ActivityError> {
        let mut req = self.http.post(self.endpoint(feed_key)?).json(&AddActivitiesBody { activities });
        if let Some(key) = &self.cfg.api_key {
            req = req.query(&[("api_key", key)]);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ActivityError::Api { status, body });
        }
        Ok(())
    }
}
