//! Persistence for deferred writes.
//!
//! Writes are appended with a monotonically increasing id, which is their
//! creation order. Entries are only ever removed by id (after a successful
//! replay), or in bulk up to a known id, so a write enqueued while a drain is
//! running is never dropped by that drain.

use super::connection::CacheDb;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Namespace for deferred-write storage keys; the collection name is appended.
pub const STORAGE_KEY_PREFIX: &str = "/offline-data/";

/// A write to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWrite {
    pub tag: String,
    pub collection: String,
    pub endpoint: String,
    pub method: String,
    pub payload: serde_json::Value,
}

/// A persisted deferred write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueuedWrite {
    pub id: i64,
    pub tag: String,
    pub collection: String,
    pub storage_key: String,
    pub endpoint: String,
    pub method: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}

struct QueuedRow {
    id: i64,
    tag: String,
    collection: String,
    storage_key: String,
    endpoint: String,
    method: String,
    payload_json: String,
    created_at: String,
}

impl QueuedRow {
    fn into_write(self) -> Result<QueuedWrite, Error> {
        let payload = serde_json::from_str(&self.payload_json)
            .map_err(|e| Error::CorruptEntry(format!("queued write {}: {e}", self.id)))?;
        Ok(QueuedWrite {
            id: self.id,
            tag: self.tag,
            collection: self.collection,
            storage_key: self.storage_key,
            endpoint: self.endpoint,
            method: self.method,
            payload,
            created_at: self.created_at,
        })
    }
}

/// Storage key for a collection.
pub fn storage_key(collection: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{collection}")
}

impl CacheDb {
    /// Append a write to the queue.
    pub async fn enqueue_write(&self, write: &NewWrite) -> Result<QueuedWrite, Error> {
        let payload_json =
            serde_json::to_string(&write.payload).map_err(|e| Error::InvalidInput(format!("payload: {e}")))?;
        let write = write.clone();
        let created_at = chrono::Utc::now().to_rfc3339();
        let key = storage_key(&write.collection);

        self.conn
            .call(move |conn| -> Result<QueuedWrite, Error> {
                conn.execute(
                    "INSERT INTO queued_writes (tag, collection, storage_key, endpoint, method, payload_json, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![write.tag, write.collection, key, write.endpoint, write.method, payload_json, created_at],
                )?;
                Ok(QueuedWrite {
                    id: conn.last_insert_rowid(),
                    tag: write.tag,
                    collection: write.collection,
                    storage_key: key,
                    endpoint: write.endpoint,
                    method: write.method,
                    payload: write.payload,
                    created_at,
                })
            })
            .await
            .map_err(Error::from)
    }

    /// Writes queued under a tag, in creation order.
    pub async fn pending_writes(&self, tag: &str) -> Result<Vec<QueuedWrite>, Error> {
        let tag = tag.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<QueuedRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, tag, collection, storage_key, endpoint, method, payload_json, created_at
                     FROM queued_writes WHERE tag = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map(params![tag], |row| {
                        Ok(QueuedRow {
                            id: row.get(0)?,
                            tag: row.get(1)?,
                            collection: row.get(2)?,
                            storage_key: row.get(3)?,
                            endpoint: row.get(4)?,
                            method: row.get(5)?,
                            payload_json: row.get(6)?,
                            created_at: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(QueuedRow::into_write).collect()
    }

    /// Remove one write after its replay succeeded.
    pub async fn remove_write(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM queued_writes WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Clear a tag's queue up to and including `through_id`.
    ///
    /// Returns the number of deleted writes.
    pub async fn clear_writes(&self, tag: &str, through_id: i64) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count =
                    conn.execute("DELETE FROM queued_writes WHERE tag = ?1 AND id <= ?2", params![tag, through_id])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of writes queued under a tag.
    pub async fn count_writes(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM queued_writes WHERE tag = ?1", params![tag], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment(amount: u32) -> NewWrite {
        NewWrite {
            tag: "payment-sync".into(),
            collection: "payments".into(),
            endpoint: "/api/payments".into(),
            method: "POST".into(),
            payload: json!({ "memberId": "m-1", "amount": amount }),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_pending_in_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.enqueue_write(&payment(100)).await.unwrap();
        let second = db.enqueue_write(&payment(200)).await.unwrap();
        assert!(first.id < second.id);
        assert_eq!(first.storage_key, "/offline-data/payments");

        let pending = db.pending_writes("payment-sync").await.unwrap();
        assert_eq!(pending, vec![first, second]);
        assert!(db.pending_writes("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_write() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let write = db.enqueue_write(&payment(100)).await.unwrap();
        assert!(db.remove_write(write.id).await.unwrap());
        assert!(!db.remove_write(write.id).await.unwrap());
        assert_eq!(db.count_writes("payment-sync").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_writes_through_id_keeps_newer() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.enqueue_write(&payment(1)).await.unwrap();
        db.enqueue_write(&payment(2)).await.unwrap();

        assert_eq!(db.clear_writes("payment-sync", first.id).await.unwrap(), 1);
        let pending = db.pending_writes("payment-sync").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload["amount"], 2);
    }
}
