//! Partition registration and eviction.
//!
//! A partition is one generation of a named cache. Deleting a partition
//! cascades to its entries, so eviction is a single statement and an entry
//! is never left behind without its partition row.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

/// The three current partition names, derived from one cache version.
///
/// Exactly one generation per role is retained at any time; activation
/// deletes every partition whose name is not one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub shell: String,
    pub runtime: String,
    pub documents: String,
}

impl PartitionNames {
    /// Names for a given cache version, e.g. version 1 yields
    /// `odl-library-v1`, `odl-runtime-v1`, `odl-pdfs-v1`.
    pub fn for_version(version: u32) -> Self {
        Self {
            shell: format!("odl-library-v{version}"),
            runtime: format!("odl-runtime-v{version}"),
            documents: format!("odl-pdfs-v{version}"),
        }
    }

    /// All three names, shell first.
    pub fn all(&self) -> [&str; 3] {
        [&self.shell, &self.runtime, &self.documents]
    }
}

impl CacheDb {
    /// Register a partition by name. Idempotent: opening an existing
    /// partition leaves it and its entries untouched.
    pub async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List all partition names, oldest first.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one partition and all its entries. Returns true if it existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition whose name is not in `retained`.
    ///
    /// This is the activation eviction policy: superseded generations are
    /// purged eagerly so storage never grows across deployments. Returns
    /// the number of partitions deleted.
    pub async fn delete_all_except(&self, retained: &[&str]) -> Result<u64, Error> {
        if retained.is_empty() {
            return self.clear_all().await;
        }
        let retained: Vec<String> = retained.iter().map(|s| s.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let placeholders = vec!["?"; retained.len()].join(", ");
                let sql = format!("DELETE FROM partitions WHERE name NOT IN ({placeholders})");
                let deleted = conn.execute(&sql, tokio_rusqlite::rusqlite::params_from_iter(retained.iter()))?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every partition. Returns the number deleted.
    pub async fn clear_all(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM partitions", [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_for_version() {
        let names = PartitionNames::for_version(1);
        assert_eq!(names.shell, "odl-library-v1");
        assert_eq!(names.runtime, "odl-runtime-v1");
        assert_eq!(names.documents, "odl-pdfs-v1");
    }

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("odl-library-v1").await.unwrap();
        db.open_partition("odl-library-v1").await.unwrap();
        assert_eq!(db.list_partitions().await.unwrap(), vec!["odl-library-v1"]);
    }

    #[tokio::test]
    async fn test_delete_all_except() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let names = PartitionNames::for_version(1);
        for name in names.all() {
            db.open_partition(name).await.unwrap();
        }
        db.open_partition("stale-old").await.unwrap();

        let deleted = db.delete_all_except(&names.all()).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = db.list_partitions().await.unwrap();
        assert_eq!(remaining.len(), 3);
        assert!(!remaining.contains(&"stale-old".to_string()));
    }

    #[tokio::test]
    async fn test_delete_partition_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_partition("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("odl-library-v1").await.unwrap();
        db.open_partition("odl-pdfs-v1").await.unwrap();
        assert_eq!(db.clear_all().await.unwrap(), 2);
        assert!(db.list_partitions().await.unwrap().is_empty());
    }
}
