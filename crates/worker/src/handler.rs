//! Event dispatch.
//!
//! One `Worker` instance owns the lifecycle state and routes every inbound
//! event to its handler. Handler errors are converted into replies or log
//! lines, never panics: a dead worker would silently strip the client of
//! offline support, so degraded handling always wins over crashing.

use std::sync::Arc;

use odl_client::fetch::Fetcher;
use odl_core::{AppConfig, CacheDb, Error, QueueTag};

use crate::events::{AppMessage, HostCommand, WorkerEvent};
use crate::lifecycle::{self, WorkerState};
use crate::notify;
use crate::router::Router;
use crate::sync;

/// The cache-router worker: state plus injected collaborators.
pub struct Worker {
    config: AppConfig,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    router: Router,
    state: WorkerState,
}

impl Worker {
    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let router = Router::new(&config, db.clone(), Arc::clone(&fetcher))?;
        Ok(Self { config, db, fetcher, router, state: WorkerState::Installing })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Mark this version redundant (host hung up or replaced us).
    pub fn retire(&mut self) {
        self.state = WorkerState::Redundant;
    }

    /// Handle one inbound event, producing zero or more host commands.
    pub async fn handle_event(&mut self, event: WorkerEvent) -> Vec<HostCommand> {
        match event {
            WorkerEvent::Install => self.on_install().await,
            WorkerEvent::Activate => self.on_activate().await,
            WorkerEvent::Fetch { id, request } => {
                let outcome = self.router.handle_fetch(&request).await;
                vec![HostCommand::FetchResult { id, outcome }]
            }
            WorkerEvent::Sync { tag } => self.on_sync(&tag).await,
            WorkerEvent::Push { payload } => {
                vec![HostCommand::ShowNotification { notification: notify::on_push(payload.as_deref()) }]
            }
            WorkerEvent::NotificationClick { action } => notify::on_click(&action).into_iter().collect(),
            WorkerEvent::Message { message } => self.on_message(message).await,
        }
    }

    async fn on_install(&mut self) -> Vec<HostCommand> {
        self.state = WorkerState::Installing;
        match lifecycle::install(&self.db, self.fetcher.as_ref(), &self.config).await {
            Ok(cached) => {
                self.state = WorkerState::Waiting;
                vec![HostCommand::InstallDone { cached }]
            }
            Err(e) => {
                tracing::error!("install failed: {e}");
                self.state = WorkerState::Redundant;
                vec![HostCommand::InstallFailed { reason: e.to_string() }]
            }
        }
    }

    async fn on_activate(&mut self) -> Vec<HostCommand> {
        match lifecycle::activate(&self.db, &self.config).await {
            Ok(purged) => {
                self.state = WorkerState::Active;
                // Takeover: control open pages now rather than on the
                // next navigation.
                vec![HostCommand::ActivateDone { purged }, HostCommand::ClaimClients]
            }
            Err(e) => {
                tracing::error!("activate failed: {e}");
                vec![HostCommand::ActivateFailed { reason: e.to_string() }]
            }
        }
    }

    async fn on_sync(&mut self, tag: &str) -> Vec<HostCommand> {
        let Some(queue) = QueueTag::parse(tag) else {
            tracing::debug!("ignoring unknown sync tag: {tag}");
            return Vec::new();
        };
        match sync::flush(&self.db, self.fetcher.as_ref(), &self.config, queue).await {
            Ok(_) => vec![HostCommand::SyncDone { tag: tag.to_string() }],
            Err(e) => {
                tracing::warn!("sync flush failed for {tag}: {e}");
                vec![HostCommand::SyncFailed { tag: tag.to_string(), reason: e.to_string() }]
            }
        }
    }

    async fn on_message(&mut self, message: AppMessage) -> Vec<HostCommand> {
        match message {
            AppMessage::CachePdf { url } => {
                if let Err(e) = self.router.cache_document(&url).await {
                    tracing::error!("failed to cache document {url}: {e}");
                }
                Vec::new()
            }
            AppMessage::ClearCache => {
                match self.db.clear_all().await {
                    Ok(cleared) => tracing::info!("cleared {cleared} cache partitions"),
                    Err(e) => tracing::error!("failed to clear caches: {e}"),
                }
                Vec::new()
            }
            AppMessage::SkipWaiting => {
                if self.state == WorkerState::Waiting {
                    self.state = WorkerState::Active;
                    vec![HostCommand::ClaimClients]
                } else {
                    Vec::new()
                }
            }
            AppMessage::QueueWrite { queue, payload } => {
                match self.db.enqueue_work(queue, &payload).await {
                    Ok(true) => tracing::debug!("queued write for {}", queue.as_str()),
                    Ok(false) => tracing::debug!("duplicate write for {} dropped", queue.as_str()),
                    Err(e) => tracing::error!("failed to queue write: {e}"),
                }
                Vec::new()
            }
        }
    }
}
