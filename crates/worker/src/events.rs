//! Bridge protocol types.
//!
//! The hosting shell delivers lifecycle and network events as JSON lines on
//! stdin; the worker answers with commands on stdout. Event names and
//! semantics follow the installable-worker model of the hosting platform;
//! only the handler behavior is ours.

use serde::{Deserialize, Serialize};

use crate::notify::Notification;
use crate::router::FetchOutcome;
use odl_core::QueueTag;

/// An intercepted request as the host saw it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    pub method: String,
    pub url: String,
    /// The request's Accept header, if any.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Messages the main application sends through the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppMessage {
    /// Explicitly cache one document URL.
    #[serde(rename = "CACHE_PDF")]
    CachePdf { url: String },

    /// Delete all cache partitions.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,

    /// Force immediate activation of a waiting version.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Enqueue a deferred write-intent for the given queue.
    #[serde(rename = "QUEUE_WRITE")]
    QueueWrite { queue: QueueTag, payload: serde_json::Value },
}

/// Inbound events, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch { id: u64, request: WireRequest },
    Sync { tag: String },
    Push {
        #[serde(default)]
        payload: Option<String>,
    },
    NotificationClick { action: String },
    Message { message: AppMessage },
}

/// Outbound commands and replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum HostCommand {
    FetchResult { id: u64, outcome: FetchOutcome },
    InstallDone { cached: u64 },
    InstallFailed { reason: String },
    ActivateDone { purged: u64 },
    ActivateFailed { reason: String },
    /// Take control of already-open client pages now.
    ClaimClients,
    SyncDone { tag: String },
    /// Re-raised to the owning scheduler so the sync is retried later.
    SyncFailed { tag: String, reason: String },
    ShowNotification { notification: Notification },
    OpenWindow { url: String },
}
