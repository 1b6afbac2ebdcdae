use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use url::Url;

use crate::config::{WorkerConfig, SCRAPE_QUEUE};
use crate::model::{PodcastId, ScrapeJob};
use crate::queue::{JobOptions, PgJobQueue};
use crate::store::{PgStore, Store};
use crate::telemetry::{self};
use crate::telemetry::ops::podcast::Phase as PodcastPhase;

/// podfeed podcast add/enqueue
#[derive(Args)]
pub struct PodcastCmd {
    #[command(subcommand)]
    pub cmd: PodcastSub,
}

#[derive(Subcommand)]
pub enum PodcastSub {
    /// Register a podcast feed (plan-only by default; use --apply to write)
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Queue one scrape job for a podcast
    Enqueue {
        #[arg(long)]
        podcast: PodcastId,
        /// Defaults to the podcast's stored feed URL
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Serialize)]
struct PodcastAddPlan { action: &'static str, url: String, title: Option<String> }

#[derive(Serialize)]
struct PodcastAddResult { podcast_id: PodcastId, inserted: bool, url: String }

#[derive(Serialize)]
struct EnqueueResult { job_id: i64, podcast: PodcastId, url: String }

pub async fn run(store: &PgStore, cfg: &WorkerConfig, args: PodcastCmd) -> Result<()> {
    match args.cmd {
        PodcastSub::Add { url, title, apply } => add_podcast(store, url, title, apply).await,
        PodcastSub::Enqueue { podcast, url } => enqueue_scrape(store, cfg, podcast, url).await,
    }
}

async fn add_podcast(store: &PgStore, url: String, title: Option<String>, apply: bool) -> Result<()> {
    let log = telemetry::podcast();
    let _g = log.root_span_kv([
        ("mode", if apply { "apply".to_string() } else { "plan".to_string() }),
        ("url", url.clone()),
        ("title", format!("{:?}", title)),
    ]).entered();

    // URL validation (friendly error before DB I/O)
    if Url::parse(&url).is_err() { bail!("Invalid URL: {}", url); }

    if !apply {
        let _s = log.span(&PodcastPhase::Plan).entered();
        log.info(format!("📝 Podcast plan — add url={} title={:?}", url, title));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            log.plan(&PodcastAddPlan { action: "add", url, title })?;
        }
        return Ok(());
    }
    let _s = log.span(&PodcastPhase::Add).entered();
    let (podcast_id, inserted) = store.upsert_podcast(&url, title.as_deref()).await.context("upsert podcast")?;
    if inserted { log.info(format!("➕ Podcast {} added", podcast_id)); } else { log.info(format!("♻️ Podcast {} updated", podcast_id)); }
    if telemetry::config::json_mode() {
        log.result(&PodcastAddResult { podcast_id, inserted, url })?;
    }
    Ok(())
}

async fn enqueue_scrape(store: &PgStore, cfg: &WorkerConfig, podcast: PodcastId, url: Option<String>) -> Result<()> {
    let log = telemetry::podcast();
    let _g = log.root_span_kv([("podcast", podcast.to_string()), ("url", format!("{:?}", url))]).entered();
    let _s = log.span(&PodcastPhase::Enqueue).entered();

    let url = match url {
        Some(u) => u,
        None => store
            .get_podcast(podcast)
            .await?
            .map(|p| p.feed_url)
            .with_context(|| format!("podcast {} not found", podcast))?,
    };
    let queue = PgJobQueue::new(store.pool().clone(), SCRAPE_QUEUE);
    let job_id = queue
        .enqueue(&ScrapeJob { podcast, url: Some(url.clone()) }, &JobOptions::with_attempts(cfg.scrape_attempts))
        .await?;
    log.info_kv("📬 scrape job queued", [("job_id", job_id.to_string()), ("podcast", podcast.to_string())]);
    if telemetry::config::json_mode() {
        log.result(&EnqueueResult { job_id, podcast, url })?;
    }
    Ok(())
}
