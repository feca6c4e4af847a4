//! HTTP fetch pipeline.
//!
//! ### The `Fetcher` seam
//! Strategies never talk to reqwest directly; they hold a `Fetcher` trait
//! object so tests can substitute a scripted network. `HttpFetcher` is the
//! production implementation.
//!
//! ### Status handling
//! A non-2xx response is still a response: it is returned to the strategy
//! layer, which decides whether to cache it (it never does) or pass it
//! through live. Only connection-level failures (DNS, refused, timeout,
//! aborted transfer) surface as errors, because only those trigger a
//! category's offline fallback.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize};

use odl_core::{Error, Snapshot};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "odl-worker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 25MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "odl-worker/0.1".to_string(),
            max_bytes: 25 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&odl_core::AppConfig> for FetchConfig {
    fn from(config: &odl_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The original URL requested
    pub url: reqwest::Url,
    /// The final URL after redirects
    pub final_url: reqwest::Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers as name/value pairs
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchedResponse {
    /// Whether this response is cacheable (only 200 snapshots are stored).
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Capture this response as an immutable snapshot for a partition.
    pub fn to_snapshot(&self, key_hash: &str) -> Snapshot {
        Snapshot {
            key_hash: key_hash.to_string(),
            url: self.url.to_string(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.bytes.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The network seam between strategies and the outside world.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a URL, returning the response whatever its status. Errors mean
    /// connection-level failure only.
    async fn get(&self, url: &reqwest::Url, accept: Option<&str>) -> Result<FetchedResponse, Error>;

    /// POST a JSON body, returning the response status. Used by the
    /// deferred-sync flush; bodies are never cached.
    async fn post_json(&self, url: &reqwest::Url, body: &serde_json::Value) -> Result<u16, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_send_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::FetchTimeout(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &reqwest::Url, accept: Option<&str>) -> Result<FetchedResponse, Error> {
        let start = Instant::now();

        let mut request = self.http.get(url.clone());
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }

        let response = request.send().await.map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms (status {}, {} bytes)",
            url,
            final_url,
            fetch_ms,
            status,
            bytes.len()
        );

        Ok(FetchedResponse { url: url.clone(), final_url, status, headers, bytes, fetch_ms })
    }

    async fn post_json(&self, url: &reqwest::Url, body: &serde_json::Value) -> Result<u16, Error> {
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "odl-worker/0.1");
        assert_eq!(config.max_bytes, 25 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = odl_core::AppConfig { max_bytes: 1024, timeout_ms: 500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_to_snapshot_captures_response() {
        let url = reqwest::Url::parse("https://library.example/books/1.pdf").unwrap();
        let response = FetchedResponse {
            url: url.clone(),
            final_url: url,
            status: 200,
            headers: vec![("content-type".to_string(), "application/pdf".to_string())],
            bytes: Bytes::from_static(b"%PDF-1.7"),
            fetch_ms: 12,
        };

        let snapshot = response.to_snapshot("abc123");
        assert_eq!(snapshot.key_hash, "abc123");
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.body, b"%PDF-1.7");
        assert!(response.is_cacheable());
    }

    #[test]
    fn test_non_200_not_cacheable() {
        let url = reqwest::Url::parse("https://library.example/api/books").unwrap();
        let response = FetchedResponse {
            url: url.clone(),
            final_url: url,
            status: 404,
            headers: Vec::new(),
            bytes: Bytes::new(),
            fetch_ms: 5,
        };
        assert!(!response.is_cacheable());
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }
}
