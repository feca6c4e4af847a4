//! Lifecycle controller.
//!
//! One deployed version moves through `Installing → Waiting → Active →
//! Redundant`. The transitions are imposed by the hosting platform; what we
//! own is the work done at each one: an all-or-nothing shell precache on
//! install, and eager eviction of superseded partitions on activation.

use odl_client::fetch::{Fetcher, canonicalize};
use odl_core::cache::entry_key;
use odl_core::{AppConfig, CacheDb, Error, Snapshot};

/// Lifecycle states of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
    Redundant,
}

/// Pre-populate the shell partition from the precache manifest.
///
/// All-or-nothing: every listed path must fetch with status 200 and store
/// successfully, or the whole installation fails and the shell partition for
/// this version is removed. A half-cached shell would make the offline page
/// unreliable. Returns the number of assets cached.
pub async fn install(db: &CacheDb, fetcher: &dyn Fetcher, config: &AppConfig) -> Result<u64, Error> {
    let names = config.partition_names();

    match precache_all(db, fetcher, config, &names.shell).await {
        Ok(cached) => Ok(cached),
        Err(e) => {
            // Drop whatever subset landed before the failure.
            if let Err(cleanup) = db.delete_partition(&names.shell).await {
                tracing::error!("failed to drop partial shell partition: {cleanup}");
            }
            Err(e)
        }
    }
}

async fn precache_all(
    db: &CacheDb,
    fetcher: &dyn Fetcher,
    config: &AppConfig,
    shell: &str,
) -> Result<u64, Error> {
    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(config.precache_paths.len());

    for path in &config.precache_paths {
        let url = canonicalize(&config.origin_url(path)).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let response = fetcher.get(&url, None).await?;
        if !response.is_cacheable() {
            return Err(Error::UnexpectedStatus(response.status));
        }
        snapshots.push(response.to_snapshot(&entry_key("GET", url.as_str())));
    }

    db.open_partition(shell).await?;
    for snapshot in &snapshots {
        db.put_entry(shell, snapshot).await?;
    }

    tracing::info!("precached {} shell assets into {shell}", snapshots.len());
    Ok(snapshots.len() as u64)
}

/// Evict every partition that is not part of the current generation, and
/// make sure the current three exist. Returns the number purged.
pub async fn activate(db: &CacheDb, config: &AppConfig) -> Result<u64, Error> {
    let names = config.partition_names();

    let purged = db.delete_all_except(&names.all()).await?;
    for name in names.all() {
        db.open_partition(name).await?;
    }

    if purged > 0 {
        tracing::info!("purged {purged} stale cache partitions");
    }
    Ok(purged)
}
