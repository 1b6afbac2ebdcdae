use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::Instrument;

use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

pub async fn run(pool: &PgPool) -> Result<()> {
    let log = telemetry::init();
    let _g = log.root_span().entered();
    // Apply any pending migrations (idempotent)
    sqlx::migrate!()
        .run(pool)
        .instrument(log.span(&InitPhase::Migrate))
        .await
        .context("run migrations")?;
    log.info("🗄️  Database initialized");
    Ok(())
}
