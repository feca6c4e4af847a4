//! Line-delimited JSON bridge to the hosting shell.
//!
//! Events arrive one JSON object per line on the reader; commands leave one
//! per line on the writer. A malformed line is logged and skipped; the
//! worker never dies over a bad message, because a dead worker silently
//! costs the client its offline support. EOF retires the worker.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::events::WorkerEvent;
use crate::handler::Worker;

/// Drive the worker until the host closes the event stream.
pub async fn run<R, W>(worker: &mut Worker, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: WorkerEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("skipping malformed event: {e}");
                continue;
            }
        };

        for command in worker.handle_event(event).await {
            let mut json = match serde_json::to_string(&command) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("unserializable command: {e}");
                    continue;
                }
            };
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
        }
        writer.flush().await?;
    }

    tracing::info!("event stream closed, retiring");
    worker.retire();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::WorkerState;
    use async_trait::async_trait;
    use bytes::Bytes;
    use odl_client::FetchedResponse;
    use odl_client::fetch::Fetcher;
    use odl_core::{AppConfig, CacheDb, Error};
    use std::sync::Arc;
    use url::Url;

    struct StubFetcher;

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn get(&self, url: &Url, _accept: Option<&str>) -> Result<FetchedResponse, Error> {
            Ok(FetchedResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                bytes: Bytes::from_static(b"asset"),
                fetch_ms: 1,
            })
        }

        async fn post_json(&self, _url: &Url, _body: &serde_json::Value) -> Result<u16, Error> {
            Ok(200)
        }
    }

    async fn make_worker() -> Worker {
        let config = AppConfig { origin: "https://library.example".into(), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        Worker::new(config, db, Arc::new(StubFetcher)).unwrap()
    }

    #[tokio::test]
    async fn test_bridge_replies_line_per_command() {
        let mut worker = make_worker().await;
        let input = b"{\"event\":\"install\"}\n{\"event\":\"activate\"}\n" as &[u8];
        let mut output = std::io::Cursor::new(Vec::new());

        run(&mut worker, input, &mut output).await.unwrap();

        let output = output.into_inner();
        let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
        assert_eq!(lines.len(), 3); // install-done, activate-done, claim-clients
        assert!(lines[0].contains("install-done"));
        assert!(lines[2].contains("claim-clients"));
        assert_eq!(worker.state(), WorkerState::Redundant); // retired at EOF
    }

    #[tokio::test]
    async fn test_bridge_skips_malformed_lines() {
        let mut worker = make_worker().await;
        let input = b"not json\n\n{\"event\":\"push\"}\n" as &[u8];
        let mut output = std::io::Cursor::new(Vec::new());

        run(&mut worker, input, &mut output).await.unwrap();

        let output = output.into_inner();
        let text = std::str::from_utf8(&output).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("show-notification"));
        assert!(text.contains("New content available!"));
    }

    #[tokio::test]
    async fn test_bridge_fetch_round_trip() {
        let mut worker = make_worker().await;
        let input = concat!(
            "{\"event\":\"fetch\",\"id\":1,",
            "\"request\":{\"method\":\"GET\",\"url\":\"https://library.example/api/books\"}}\n",
        )
        .as_bytes();
        let mut output = std::io::Cursor::new(Vec::new());

        run(&mut worker, input, &mut output).await.unwrap();

        let output = output.into_inner();
        let line = std::str::from_utf8(&output).unwrap().lines().next().unwrap();
        let reply: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(reply["command"], "fetch-result");
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["outcome"]["outcome"], "respond");
        assert_eq!(reply["outcome"]["response"]["status"], 200);
    }
}
