use anyhow::Result;
use clap::Parser;
use nova_core::config::Config;
use nova_core::scheduler::Scheduler;
use nova_store::bmc::DbBmc;
use nova_store::{get_pg_connection_pool, perform_migration, DbModelManager, PgConnectionString};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nova-server", about = "Fleet and mission resolution server")]
struct CliArgs {
    /// Postgres connection string; falls back to NOVA_DATABASE_URL.
    #[arg(long, env = "NOVA_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    poll_interval_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();
    let mut config = match args.database_url {
        Some(url) => Config::with_database_url(url),
        None => Config::from_env()?,
    };
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(poll) = args.poll_interval_seconds {
        config.poll_interval_seconds = poll;
    }

    let pool = get_pg_connection_pool(PgConnectionString(config.database_url.clone())).await?;
    perform_migration(&pool).await?;

    let bmc = Arc::new(DbBmc::new(DbModelManager::new(pool)));
    let scheduler = Arc::new(Scheduler::new(bmc, &config));

    let cancellation = CancellationToken::new();
    let shutdown = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            event!(Level::INFO, "shutdown requested");
            shutdown.cancel();
        }
    });

    scheduler.run(cancellation).await;
    Ok(())
}
