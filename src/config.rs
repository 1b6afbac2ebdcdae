use std::time::Duration;

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;
const DEFAULT_USER_AGENT: &str = "podfeed/0.1";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_SCRAPE_ATTEMPTS: i32 = 3;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 30;
const DEFAULT_SCRAPE_INTERVAL_MINS: i64 = 15;
const DEFAULT_ACTIVITY_BASE_URL: &str = "http://localhost:8090/api/v1.0";
const DEFAULT_ACTIVITY_TIMEOUT_SECS: u64 = 10;

pub const SCRAPE_QUEUE: &str = "scrape";
pub const ENRICH_QUEUE: &str = "enrich";

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub poll_interval: Duration,
    /// Queue-level attempts for scrape jobs (enrichment jobs always get one).
    pub scrape_attempts: i32,
    pub retry_backoff: Duration,
    pub scrape_interval: chrono::Duration,
    pub activity: ActivityFeedConfig,
}

#[derive(Clone, Debug)]
pub struct ActivityFeedConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            scrape_attempts: DEFAULT_SCRAPE_ATTEMPTS,
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
            scrape_interval: chrono::Duration::minutes(DEFAULT_SCRAPE_INTERVAL_MINS),
            activity: ActivityFeedConfig::default(),
        }
    }
}

impl Default for ActivityFeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ACTIVITY_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_ACTIVITY_TIMEOUT_SECS),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = get("PODFEED_FETCH_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(ua) = get("PODFEED_USER_AGENT") {
            cfg.user_agent = ua;
        }
        if let Some(ms) = get("PODFEED_POLL_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = get("PODFEED_SCRAPE_ATTEMPTS").and_then(|v| v.parse::<i32>().ok()) {
            cfg.scrape_attempts = n.max(1);
        }
        if let Some(secs) = get("PODFEED_RETRY_BACKOFF_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.retry_backoff = Duration::from_secs(secs);
        }
        if let Some(mins) = get("PODFEED_SCRAPE_INTERVAL_MINS").and_then(|v| v.parse::<i64>().ok()) {
            cfg.scrape_interval = chrono::Duration::minutes(mins.max(1));
        }
        if let Some(base) = get("ACTIVITY_FEED_BASE_URL") {
            cfg.activity.base_url = base;
        }
        cfg.activity.api_key = get("ACTIVITY_FEED_API_KEY");
        if let Some(secs) = get("ACTIVITY_FEED_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.activity.timeout = Duration::from_secs(secs);
        }
        cfg
    }
}
