use std::time::Duration;

use anyhow::Result;
use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Pool, Postgres};
use tracing::{event, Level};

#[derive(Clone)]
pub struct PgConnectionString(pub String);

pub async fn get_pg_connection_pool(connection_string: PgConnectionString) -> Result<Pool<Postgres>> {
    let database_url = connection_string.0.clone();

    let database_connection_options: PgConnectOptions = database_url
        .parse::<PgConnectOptions>()?
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(60));

    let pg_connection_pool: Pool<Postgres> = PgPoolOptions::new()
        .max_connections(5)
        .connect_with(database_connection_options)
        .await?;

    Ok(pg_connection_pool)
}

pub async fn perform_migration(pool: &Pool<Postgres>) -> Result<()> {
    event!(Level::INFO, "Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
