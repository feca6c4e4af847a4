//! Strategy executor.
//!
//! Selects and runs one fetch strategy per classified request. The three
//! strategies trade staleness against availability differently per content
//! class:
//!
//! - shell assets: cache-then-refresh (instant response, freshness catches
//!   up in the background)
//! - API calls: network-first with stale fallback (correctness when online,
//!   best effort when not)
//! - documents: cache-first, no refresh (large and immutable once published)
//!
//! Everything the executor touches (partition store, network, rule tables)
//! is injected, so the strategies are unit-testable without a host runtime.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use odl_client::classify::{Classification, RoutingRules, classify};
use odl_client::fetch::{Fetcher, canonicalize};
use odl_core::cache::{PartitionNames, entry_key};
use odl_core::{AppConfig, CacheDb, Error, Snapshot};

use crate::events::WireRequest;

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached root document standing in for an unreachable shell asset.
    OfflineFallback,
    /// A structured offline error built by the worker itself.
    Synthesized,
}

/// The response handed back to the host for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl RoutedResponse {
    fn from_snapshot(snapshot: Snapshot, source: ResponseSource) -> Self {
        Self { status: snapshot.status, headers: snapshot.headers, body: snapshot.body, source }
    }

    fn from_network(response: &odl_client::FetchedResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.bytes.to_vec(),
            source: ResponseSource::Network,
        }
    }

    /// Structured offline error for API calls.
    fn offline_api_error() -> Self {
        let body = serde_json::json!({"error": "Network error", "offline": true});
        Self {
            status: 503,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap_or_default(),
            source: ResponseSource::Synthesized,
        }
    }

    /// Plain-text offline stub for documents never downloaded.
    fn offline_document_stub() -> Self {
        Self {
            status: 503,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: b"PDF not available offline".to_vec(),
            source: ResponseSource::Synthesized,
        }
    }
}

/// Result of routing one intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum FetchOutcome {
    /// Serve this response to the page.
    Respond { response: RoutedResponse },
    /// The router must not touch this request; the host performs the
    /// default network fetch.
    Bypass,
    /// No cache, no network, no fallback: the request fails to the caller.
    Fail,
}

/// Routes intercepted requests through the cache partitions.
pub struct Router {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    rules: RoutingRules,
    names: PartitionNames,
    /// Canonical URL of the root document, the static offline fallback.
    root_url: Url,
}

impl Router {
    pub fn new(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let root_url =
            canonicalize(&config.origin_url("/")).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            db,
            fetcher,
            rules: RoutingRules::from_config(config),
            names: config.partition_names(),
            root_url,
        })
    }

    /// Route one intercepted request.
    pub async fn handle_fetch(&self, request: &WireRequest) -> FetchOutcome {
        let url = match canonicalize(&request.url) {
            Ok(url) => url,
            // Extension schemes, data URLs, malformed input: default handling.
            Err(_) => return FetchOutcome::Bypass,
        };

        let accept = request.accept.as_deref();
        let Some(classification) = classify(&self.rules, &request.method, &url, accept) else {
            return FetchOutcome::Bypass;
        };

        match classification {
            Classification::Document => FetchOutcome::Respond {
                response: self.document_strategy(&url, accept).await,
            },
            Classification::Api => FetchOutcome::Respond {
                response: self.api_strategy(&url, accept).await,
            },
            Classification::Static => match self.static_strategy(&url, accept).await {
                Some(response) => FetchOutcome::Respond { response },
                None => FetchOutcome::Fail,
            },
        }
    }

    /// Cache-first, network fallback, offline stub.
    ///
    /// No background refresh: a published document never changes, and
    /// re-fetching multi-megabyte PDFs on every read would be waste.
    async fn document_strategy(&self, url: &Url, accept: Option<&str>) -> RoutedResponse {
        let key = entry_key("GET", url.as_str());

        if let Some(snapshot) = self.lookup(&self.names.documents, &key).await {
            tracing::debug!("serving document from cache: {url}");
            return RoutedResponse::from_snapshot(snapshot, ResponseSource::Cache);
        }

        match self.fetcher.get(url, accept).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(&self.names.documents, &response.to_snapshot(&key)).await;
                }
                RoutedResponse::from_network(&response)
            }
            Err(e) => {
                tracing::debug!("document fetch failed for {url}: {e}");
                // Race safety: a concurrent handler may have stored it
                // between our miss and the failed fetch.
                if let Some(snapshot) = self.lookup(&self.names.documents, &key).await {
                    return RoutedResponse::from_snapshot(snapshot, ResponseSource::Cache);
                }
                RoutedResponse::offline_document_stub()
            }
        }
    }

    /// Network-first, stale-cache fallback, structured offline error.
    ///
    /// A non-200 answer is still an answer: it is returned live and never
    /// cached. Only connection failures reach for the runtime partition.
    async fn api_strategy(&self, url: &Url, accept: Option<&str>) -> RoutedResponse {
        let key = entry_key("GET", url.as_str());

        match self.fetcher.get(url, accept).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(&self.names.runtime, &response.to_snapshot(&key)).await;
                }
                RoutedResponse::from_network(&response)
            }
            Err(e) => {
                tracing::debug!("api fetch failed for {url}, trying cache: {e}");
                if let Some(snapshot) = self.lookup(&self.names.runtime, &key).await {
                    return RoutedResponse::from_snapshot(snapshot, ResponseSource::Cache);
                }
                RoutedResponse::offline_api_error()
            }
        }
    }

    /// Cache-then-refresh; on a total miss the cached root document stands
    /// in as the offline page. Returns None when even that is absent.
    async fn static_strategy(&self, url: &Url, accept: Option<&str>) -> Option<RoutedResponse> {
        let key = entry_key("GET", url.as_str());

        if let Some(snapshot) = self.lookup(&self.names.shell, &key).await {
            self.spawn_refresh(url.clone(), accept.map(str::to_string), key);
            return Some(RoutedResponse::from_snapshot(snapshot, ResponseSource::Cache));
        }

        match self.fetcher.get(url, accept).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(&self.names.shell, &response.to_snapshot(&key)).await;
                }
                Some(RoutedResponse::from_network(&response))
            }
            Err(e) => {
                tracing::debug!("static fetch failed for {url}: {e}");
                let root_key = entry_key("GET", self.root_url.as_str());
                self.lookup(&self.names.shell, &root_key)
                    .await
                    .map(|snapshot| RoutedResponse::from_snapshot(snapshot, ResponseSource::OfflineFallback))
            }
        }
    }

    /// Explicitly cache one document URL (the CACHE_PDF message).
    ///
    /// Idempotent: an already-cached document performs zero fetches.
    pub async fn cache_document(&self, raw_url: &str) -> Result<(), Error> {
        let url = canonicalize(raw_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let key = entry_key("GET", url.as_str());

        if self.lookup(&self.names.documents, &key).await.is_some() {
            tracing::debug!("document already cached: {url}");
            return Ok(());
        }

        let response = self.fetcher.get(&url, Some("application/pdf")).await?;
        if !response.is_cacheable() {
            return Err(Error::UnexpectedStatus(response.status));
        }

        self.db.put_entry(&self.names.documents, &response.to_snapshot(&key)).await?;
        tracing::info!("document cached: {url}");
        Ok(())
    }

    /// Fire-and-forget refresh of a shell entry. Never awaited by the
    /// response path; failures are swallowed because the caller already
    /// holds a usable response.
    fn spawn_refresh(&self, url: Url, accept: Option<String>, key: String) {
        let db = self.db.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let partition = self.names.shell.clone();
        tokio::spawn(async move {
            match fetcher.get(&url, accept.as_deref()).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = db.put_entry(&partition, &response.to_snapshot(&key)).await {
                        tracing::warn!("background refresh store failed for {url}: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("background refresh failed for {url}: {e}");
                }
            }
        });
    }

    /// A partition read that degrades to a miss. Lookup errors must never
    /// take down request handling; the network path still works.
    async fn lookup(&self, partition: &str, key: &str) -> Option<Snapshot> {
        match self.db.get_entry(partition, key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("cache lookup failed in {partition}: {e}");
                None
            }
        }
    }

    /// A partition write that degrades to "not cached". Storage-quota
    /// exhaustion costs us the snapshot, not the response.
    async fn store(&self, partition: &str, snapshot: &Snapshot) {
        if let Err(e) = self.db.put_entry(partition, snapshot).await {
            tracing::warn!("cache store failed in {partition}: {e}");
        }
    }
}
