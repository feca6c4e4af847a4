//! Durable deferred-sync queue.
//!
//! Write-intents that failed while offline are held here until the host
//! signals connectivity restored. Items live in the same SQLite database as
//! the cache so they survive worker restarts, and are deduplicated by
//! payload hash. A queue is cleared only after its remote batch write
//! succeeds; on failure the items stay put and the flush error propagates.

use crate::Error;
use crate::cache::connection::CacheDb;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_rusqlite::params;

/// The two independently flushed queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueTag {
    #[serde(rename = "sync-subscriptions")]
    Subscriptions,
    #[serde(rename = "sync-progress")]
    Progress,
}

impl QueueTag {
    /// The sync-event tag, also used as the storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueTag::Subscriptions => "sync-subscriptions",
            QueueTag::Progress => "sync-progress",
        }
    }

    /// Parse a sync-event tag. Unknown tags are not an error upstream;
    /// the dispatcher ignores them.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "sync-subscriptions" => Some(QueueTag::Subscriptions),
            "sync-progress" => Some(QueueTag::Progress),
            _ => None,
        }
    }
}

/// One queued write-intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub queue: QueueTag,
    pub item_hash: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}

fn payload_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

impl CacheDb {
    /// Enqueue a write-intent. Returns false if an identical payload was
    /// already queued (the enqueue is then a no-op).
    pub async fn enqueue_work(&self, tag: QueueTag, payload: &serde_json::Value) -> Result<bool, Error> {
        let payload_json = serde_json::to_string(payload)
            .map_err(|e| Error::InvalidInput(format!("unserializable payload: {e}")))?;
        let item_hash = payload_hash(&payload_json);
        let queue = tag.as_str();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO sync_queue (queue, item_hash, payload_json, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![queue, item_hash, payload_json, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Read a queue's pending items, oldest first.
    pub async fn pending_work(&self, tag: QueueTag) -> Result<Vec<WorkItem>, Error> {
        let queue = tag.as_str();
        self.conn
            .call(move |conn| -> Result<Vec<WorkItem>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT item_hash, payload_json, created_at FROM sync_queue
                     WHERE queue = ?1 ORDER BY created_at, item_hash",
                )?;
                let rows = stmt
                    .query_map(params![queue], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut items = Vec::with_capacity(rows.len());
                for (item_hash, payload_json, created_at) in rows {
                    let payload = serde_json::from_str(&payload_json)
                        .map_err(|e| Error::InvalidInput(format!("corrupt payload_json: {e}")))?;
                    items.push(WorkItem { queue: tag, item_hash, payload, created_at });
                }
                Ok(items)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every item in a queue. Called only after the remote write
    /// succeeded. Returns the number of items removed.
    pub async fn clear_queue(&self, tag: QueueTag) -> Result<u64, Error> {
        let queue = tag.as_str();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM sync_queue WHERE queue = ?1", params![queue])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_enqueue_and_pending() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let payload = json!({"book_id": 7, "page": 42});

        assert!(db.enqueue_work(QueueTag::Progress, &payload).await.unwrap());

        let items = db.pending_work(QueueTag::Progress).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload, payload);
        assert_eq!(items[0].queue, QueueTag::Progress);
    }

    #[tokio::test]
    async fn test_enqueue_dedup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let payload = json!({"plan": "monthly"});

        assert!(db.enqueue_work(QueueTag::Subscriptions, &payload).await.unwrap());
        assert!(!db.enqueue_work(QueueTag::Subscriptions, &payload).await.unwrap());

        let items = db.pending_work(QueueTag::Subscriptions).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_queues_independent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue_work(QueueTag::Subscriptions, &json!({"plan": "monthly"}))
            .await
            .unwrap();
        db.enqueue_work(QueueTag::Progress, &json!({"page": 1}))
            .await
            .unwrap();

        assert_eq!(db.clear_queue(QueueTag::Subscriptions).await.unwrap(), 1);
        assert_eq!(db.pending_work(QueueTag::Progress).await.unwrap().len(), 1);
    }

    #[test]
    fn test_tag_parse_round_trip() {
        for tag in [QueueTag::Subscriptions, QueueTag::Progress] {
            assert_eq!(QueueTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(QueueTag::parse("sync-unknown"), None);
    }
}
