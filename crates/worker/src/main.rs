//! odl-worker entry point.
//!
//! Boots the cache-router worker on stdio transport: events in on stdin,
//! commands out on stdout. Logging goes to stderr to keep the line protocol
//! on stdout clean.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod bridge;
mod events;
mod handler;
mod lifecycle;
mod notify;
mod router;
mod sync;

use odl_client::{FetchConfig, HttpFetcher};
use odl_core::{AppConfig, CacheDb};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        "starting odl-worker for {} (cache generation {})",
        config.origin,
        config.cache_version
    );

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);

    let mut worker = handler::Worker::new(config, db, fetcher)?;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    bridge::run(&mut worker, stdin, stdout).await?;

    tracing::info!("odl-worker stopped in state {:?}", worker.state());
    Ok(())
}
