use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::activity::HttpActivityClient;
use crate::config::{WorkerConfig, ENRICH_QUEUE, SCRAPE_QUEUE};
use crate::feed::HttpFeedSource;
use crate::ingestion::Ingestor;
use crate::queue::{PgJobQueue, Worker};
use crate::store::PgStore;

/// Consume scrape jobs until interrupted
#[derive(Args, Debug)]
pub struct WorkCmd {
    #[arg(long, default_value = SCRAPE_QUEUE)] pub queue: String,
}

pub async fn run(store: PgStore, cfg: WorkerConfig, args: WorkCmd) -> Result<()> {
    let feeds = HttpFeedSource::new(cfg.fetch_timeout, &cfg.user_agent).context("build feed http client")?;
    let activities = HttpActivityClient::new(cfg.activity.clone()).context("build activity feed client")?;
    let enrichment = PgJobQueue::new(store.pool().clone(), ENRICH_QUEUE);
    let jobs = PgJobQueue::new(store.pool().clone(), args.queue);

    let ingestor = Ingestor::new(Arc::new(store), Arc::new(feeds), Arc::new(activities), Arc::new(enrichment));
    let worker = Worker::new(jobs, ingestor, cfg.poll_interval, cfg.retry_backoff);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            on_signal.cancel();
        }
    });

    worker.run(cancel).await?;
    Ok(())
}
