//! Application configuration with layered loading.
//!
//! Configuration management using figment for layered loading from
//! multiple sources:
//!
//! 1. Environment variables (ODL_WORKER_*)
//! 2. TOML config file (if ODL_WORKER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

use crate::cache::PartitionNames;
use crate::sync::QueueTag;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ODL_WORKER_*)
/// 2. TOML config file (if ODL_WORKER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Application origin that relative paths (precache manifest, sync
    /// endpoints) resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request. Documents dominate, so this is
    /// sized for PDFs rather than pages.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Cache generation. Bumping this supersedes all three partitions;
    /// the old generation is purged on activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Paths guaranteed cached on install, resolved against `origin`.
    #[serde(default = "default_precache_paths")]
    pub precache_paths: Vec<String>,

    /// Path suffixes classified as documents.
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// Host substrings of known third-party file-hosting domains.
    #[serde(default = "default_document_hosts")]
    pub document_hosts: Vec<String>,

    /// Path substrings classified as API calls.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Host substrings of the data/auth service and payment provider.
    #[serde(default = "default_service_hosts")]
    pub service_hosts: Vec<String>,

    /// Endpoint path for flushing the subscription-sync queue.
    #[serde(default = "default_sync_subscriptions_path")]
    pub sync_subscriptions_path: String,

    /// Endpoint path for flushing the progress-sync queue.
    #[serde(default = "default_sync_progress_path")]
    pub sync_progress_path: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./odl-worker-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "odl-worker/0.1".into()
}

fn default_max_bytes() -> usize {
    26_214_400 // 25MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_cache_version() -> u32 {
    1
}

fn default_precache_paths() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "/manifest.json".into(),
        "/icons/icon-192x192.png".into(),
        "/icons/icon-512x512.png".into(),
    ]
}

fn default_document_extensions() -> Vec<String> {
    vec![".pdf".into()]
}

fn default_document_hosts() -> Vec<String> {
    vec!["drive.google.com".into()]
}

fn default_api_prefixes() -> Vec<String> {
    vec!["/api/".into()]
}

fn default_service_hosts() -> Vec<String> {
    vec!["supabase".into(), "paystack".into()]
}

fn default_sync_subscriptions_path() -> String {
    "/api/sync-subscriptions".into()
}

fn default_sync_progress_path() -> String {
    "/api/sync-progress".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            cache_version: default_cache_version(),
            precache_paths: default_precache_paths(),
            document_extensions: default_document_extensions(),
            document_hosts: default_document_hosts(),
            api_prefixes: default_api_prefixes(),
            service_hosts: default_service_hosts(),
            sync_subscriptions_path: default_sync_subscriptions_path(),
            sync_progress_path: default_sync_progress_path(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The current partition names for this cache generation.
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::for_version(self.cache_version)
    }

    /// Absolute URL for a queue's flush endpoint.
    pub fn sync_endpoint(&self, tag: QueueTag) -> String {
        let path = match tag {
            QueueTag::Subscriptions => &self.sync_subscriptions_path,
            QueueTag::Progress => &self.sync_progress_path,
        };
        format!("{}{}", self.origin.trim_end_matches('/'), path)
    }

    /// Absolute URL for an origin-relative path.
    pub fn origin_url(&self, path: &str) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), path)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or validation
    /// fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ODL_WORKER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ODL_WORKER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
