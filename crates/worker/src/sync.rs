//! Deferred-sync flush.
//!
//! Triggered by the host's connectivity-restored signal, once per queue
//! tag. The batch is cleared only after the remote write succeeds; a failed
//! flush leaves the queue intact and returns the error so the owning
//! scheduler re-signals later. Retry pacing belongs to the platform, not
//! here.

use odl_client::fetch::Fetcher;
use odl_core::{AppConfig, CacheDb, Error, QueueTag};
use url::Url;

/// Flush one queue as a single batch POST. Returns the number of items
/// delivered (zero when the queue was already empty).
pub async fn flush(db: &CacheDb, fetcher: &dyn Fetcher, config: &AppConfig, tag: QueueTag) -> Result<u64, Error> {
    let items = db.pending_work(tag).await?;
    if items.is_empty() {
        return Ok(0);
    }

    let batch: Vec<serde_json::Value> = items.into_iter().map(|item| item.payload).collect();
    let count = batch.len() as u64;

    let endpoint = config.sync_endpoint(tag);
    let url = Url::parse(&endpoint).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;

    let status = fetcher
        .post_json(&url, &serde_json::Value::Array(batch))
        .await
        .map_err(|e| Error::SyncFailed(format!("{}: {e}", tag.as_str())))?;

    if !(200..300).contains(&status) {
        return Err(Error::SyncFailed(format!("{}: status {status}", tag.as_str())));
    }

    db.clear_queue(tag).await?;
    tracing::info!("flushed {count} items from {}", tag.as_str());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use odl_client::FetchedResponse;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records posted batches and answers with a scripted status.
    struct ScriptedSink {
        status: Result<u16, ()>,
        posted: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl ScriptedSink {
        fn new(status: Result<u16, ()>) -> Self {
            Self { status, posted: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedSink {
        async fn get(&self, _url: &Url, _accept: Option<&str>) -> Result<FetchedResponse, Error> {
            Err(Error::Network("not a fetch test".to_string()))
        }

        async fn post_json(&self, url: &Url, body: &serde_json::Value) -> Result<u16, Error> {
            self.posted.lock().unwrap().push((url.to_string(), body.clone()));
            self.status
                .map_err(|_| Error::Network("connection refused".to_string()))
        }
    }

    fn test_config() -> AppConfig {
        AppConfig { origin: "https://library.example".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_flush_empty_queue_is_success() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let sink = ScriptedSink::new(Ok(200));

        let flushed = flush(&db, &sink, &test_config(), QueueTag::Progress).await.unwrap();

        assert_eq!(flushed, 0);
        assert!(sink.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flush_posts_batch_and_clears() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue_work(QueueTag::Progress, &json!({"book_id": 7, "page": 12}))
            .await
            .unwrap();
        db.enqueue_work(QueueTag::Progress, &json!({"book_id": 7, "page": 30}))
            .await
            .unwrap();
        let sink = ScriptedSink::new(Ok(200));

        let flushed = flush(&db, &sink, &test_config(), QueueTag::Progress).await.unwrap();

        assert_eq!(flushed, 2);
        assert!(db.pending_work(QueueTag::Progress).await.unwrap().is_empty());

        let posted = sink.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "https://library.example/api/sync-progress");
        assert_eq!(posted[0].1.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_flush_failure_keeps_queue() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue_work(QueueTag::Subscriptions, &json!({"plan": "monthly"}))
            .await
            .unwrap();
        let sink = ScriptedSink::new(Err(()));

        let result = flush(&db, &sink, &test_config(), QueueTag::Subscriptions).await;

        assert!(matches!(result, Err(Error::SyncFailed(_))));
        assert_eq!(db.pending_work(QueueTag::Subscriptions).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flush_rejects_server_error_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue_work(QueueTag::Subscriptions, &json!({"plan": "monthly"}))
            .await
            .unwrap();
        let sink = ScriptedSink::new(Ok(500));

        let result = flush(&db, &sink, &test_config(), QueueTag::Subscriptions).await;

        assert!(matches!(result, Err(Error::SyncFailed(_))));
        assert_eq!(db.pending_work(QueueTag::Subscriptions).await.unwrap().len(), 1);
    }
}
