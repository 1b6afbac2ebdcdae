use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::config::{WorkerConfig, SCRAPE_QUEUE};
use crate::model::{PodcastId, ScrapeJob};
use crate::queue::{JobOptions, PgJobQueue};
use crate::store::PgStore;
use crate::telemetry::{self};
use crate::telemetry::ops::schedule::Phase as SchedulePhase;

/// Queue scrape jobs for podcasts whose last scrape is older than the scrape interval.
#[derive(Args)]
pub struct ScheduleCmd {
    #[arg(long, default_value_t = 500)] pub limit: i64,
    #[arg(long, default_value_t = false)] pub apply: bool,
    #[arg(long, default_value_t = 10)] pub plan_limit: usize,
}

#[derive(Serialize)]
struct StalePodcast { podcast_id: PodcastId, feed_url: String, consecutive_scrape_failures: i32 }

#[derive(Serialize)]
struct SchedulePlan { stale: usize, interval_mins: i64, sample: Vec<StalePodcast> }

#[derive(Serialize)]
struct ScheduleResult { enqueued: usize }

pub async fn run(store: &PgStore, cfg: &WorkerConfig, args: ScheduleCmd) -> Result<()> {
    let log = telemetry::schedule();
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("limit", args.limit.to_string()),
    ]).entered();

    let cutoff = Utc::now() - cfg.scrape_interval;
    let stale = store.list_stale_podcasts(cutoff, args.limit).await?;

    if !args.apply {
        let _s = log.span(&SchedulePhase::Plan).entered();
        if telemetry::config::json_mode() {
            let sample = stale.iter().take(args.plan_limit)
                .map(|p| StalePodcast { podcast_id: p.podcast_id, feed_url: p.feed_url.clone(), consecutive_scrape_failures: p.consecutive_scrape_failures })
                .collect();
            log.plan(&SchedulePlan { stale: stale.len(), interval_mins: cfg.scrape_interval.num_minutes(), sample })?;
        } else {
            log.info(format!("📝 Schedule plan — stale={} interval={}m", stale.len(), cfg.scrape_interval.num_minutes()));
            for p in stale.iter().take(args.plan_limit) {
                log.info(format!("  podcast_id={} url={} failures={}", p.podcast_id, p.feed_url, p.consecutive_scrape_failures));
            }
            if stale.len() > args.plan_limit { log.info(format!("  ... ({} more)", stale.len() - args.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let _s = log.span(&SchedulePhase::Enqueue).entered();
    let queue = PgJobQueue::new(store.pool().clone(), SCRAPE_QUEUE);
    let opts = JobOptions::with_attempts(cfg.scrape_attempts);
    let mut enqueued = 0usize;
    for p in &stale {
        queue.enqueue(&ScrapeJob { podcast: p.podcast_id, url: Some(p.feed_url.clone()) }, &opts).await?;
        enqueued += 1;
    }
    log.info(format!("📬 Queued {} scrape job(s)", enqueued));
    if telemetry::config::json_mode() {
        log.result(&ScheduleResult { enqueued })?;
    }
    Ok(())
}
