use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

mod activity;
mod config;
mod enrich;
mod error;
mod feed;
mod health;
mod ingestion;
mod init;
mod model;
mod podcast;
mod queue;
mod reconcile;
mod schedule;
mod store;
mod telemetry;
mod work;
#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(name = "podfeed", about = "Podcast feed ingestion worker")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Init,
    Podcast(podcast::PodcastCmd),
    Schedule(schedule::ScheduleCmd),
    Work(work::WorkCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and PODFEED_LOG_FORMAT
    telemetry::config::init_tracing();
    let cfg = config::WorkerConfig::from_env();

    let dsn = cli
        .dsn
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("connect to database")?;
    let store = store::PgStore::new(pool);

    match cli.command {
        Commands::Init => init::run(store.pool()).await?,
        Commands::Podcast(args) => podcast::run(&store, &cfg, args).await?,
        Commands::Schedule(args) => schedule::run(&store, &cfg, args).await?,
        Commands::Work(args) => work::run(store, cfg, args).await?,
    }

    Ok(())
}
