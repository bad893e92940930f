//! Stored response entries.
//!
//! Entries are keyed by `(generation, request key hash)`. Overwriting an
//! existing key updates the row in place, so `keys` keeps reporting the
//! original insertion order.

use super::connection::CacheDb;
use crate::Error;
use crate::request::{RequestKey, Response};
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored request key, as listed by [`CacheDb::keys`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedKey {
    pub method: String,
    pub url: String,
    pub stored_at: String,
}

/// Entry count of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStats {
    pub name: String,
    pub entries: u64,
}

/// Raw row before header decoding.
struct StoredRow {
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { status: row.get(0)?, status_text: row.get(1)?, headers_json: row.get(2)?, body: row.get(3)? })
    }

    fn into_response(self) -> Result<Response, Error> {
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(Response { status: self.status, status_text: self.status_text, headers, body: Bytes::from(self.body) })
    }
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (
        generation, key_hash, method, url, status, status_text, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(generation, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        status_text = excluded.status_text,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

/// Owned parameters for one upsert, so the closure can be `'static`.
struct EntryParams {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryParams {
    fn new(key: &RequestKey, response: &Response) -> Result<Self, Error> {
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            key_hash: key.hash(),
            method: key.method.clone(),
            url: key.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json,
            body: response.body.to_vec(),
        })
    }

    fn upsert(&self, conn: &rusqlite::Connection, generation: &str, stored_at: &str) -> rusqlite::Result<usize> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                generation,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.status_text,
                &self.headers_json,
                &self.body,
                stored_at,
            ],
        )
    }
}

impl CacheDb {
    /// Store a response snapshot, replacing any prior entry for the same key.
    ///
    /// Creates the generation if it does not exist yet.
    pub async fn put(&self, generation: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let entry = EntryParams::new(key, response)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                entry.upsert(&tx, &generation, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store several responses in one transaction: all of them or none.
    pub async fn put_all(&self, generation: &str, entries: &[(RequestKey, Response)]) -> Result<(), Error> {
        let generation = generation.to_string();
        let entries = entries
            .iter()
            .map(|(key, response)| EntryParams::new(key, response))
            .collect::<Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                for entry in &entries {
                    entry.upsert(&tx, &generation, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a key in one generation.
    pub async fn match_in(&self, generation: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, status_text, headers_json, body FROM entries
                     WHERE generation = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![generation, key_hash], StoredRow::from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(StoredRow::into_response).transpose()
    }

    /// Look up a key across all generations.
    ///
    /// An entry in `preferred` wins; otherwise the oldest generation holding
    /// the key answers.
    pub async fn match_request(&self, key: &RequestKey, preferred: Option<&str>) -> Result<Option<Response>, Error> {
        let preferred = preferred.unwrap_or_default().to_string();
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.status, e.status_text, e.headers_json, e.body
                     FROM entries e JOIN generations g ON g.name = e.generation
                     WHERE e.key_hash = ?1
                     ORDER BY (e.generation = ?2) DESC, g.rowid ASC
                     LIMIT 1",
                )?;

                match stmt.query_row(params![key_hash, preferred], StoredRow::from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        if row.is_some() {
            tracing::debug!(key = %key, "cache hit");
        }

        row.map(StoredRow::into_response).transpose()
    }

    /// Remove one entry. Returns false if it was not stored.
    pub async fn delete_entry(&self, generation: &str, key: &RequestKey) -> Result<bool, Error> {
        let generation = generation.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Keys stored in a generation, in insertion order.
    pub async fn keys(&self, generation: &str) -> Result<Vec<CachedKey>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CachedKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, stored_at FROM entries WHERE generation = ?1 ORDER BY rowid ASC",
                )?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(CachedKey { method: row.get(0)?, url: row.get(1)?, stored_at: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts per generation, in creation order.
    pub async fn stats(&self) -> Result<Vec<GenerationStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, COUNT(e.key_hash) FROM generations g
                     LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name ORDER BY g.rowid ASC",
                )?;
                let stats = stmt
                    .query_map([], |row| {
                        Ok(GenerationStats { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop the oldest entries of a generation until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru(&self, generation: &str, max_entries: usize) -> Result<u64, Error> {
        let generation = generation.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                        SELECT rowid FROM entries WHERE generation = ?1 ORDER BY rowid ASC LIMIT ?2
                    )",
                    params![generation, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose URL contains `domain`, across all generations.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_by_domain(&self, domain: &str) -> Result<u64, Error> {
        let pattern = format!("%{domain}%");
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE url LIKE ?1", params![pattern])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
