//! Cache generations: named, versioned containers of stored responses.
//!
//! A generation's name encodes its role and version tag. The current worker
//! version owns exactly three names ([`CacheNames`]); anything else found in
//! storage at activation time is stale and is evicted.

use std::collections::HashSet;
use std::fmt;

use super::connection::CacheDb;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Semantic purpose of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Legacy combined name kept so upgrades from single-cache deployments do
    /// not evict it.
    Combined,
    /// Install-time precache.
    Static,
    /// Runtime-fetched responses.
    Dynamic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Combined => "combined",
            Role::Static => "static",
            Role::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{role, version}` identity of a generation under a shared prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationId {
    pub prefix: String,
    pub role: Role,
    pub version: String,
}

impl GenerationId {
    pub fn new(prefix: impl Into<String>, role: Role, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), role, version: version.into() }
    }

    /// Storage name: `{prefix}-{version}` for the combined role,
    /// `{prefix}-{role}-{version}` otherwise.
    pub fn name(&self) -> String {
        match self.role {
            Role::Combined => format!("{}-{}", self.prefix, self.version),
            role => format!("{}-{}-{}", self.prefix, role, self.version),
        }
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The generations owned by one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub combined: GenerationId,
    pub static_assets: GenerationId,
    pub dynamic: GenerationId,
}

impl CacheNames {
    /// Names that survive activation.
    pub fn current_names(&self) -> HashSet<String> {
        [&self.combined, &self.static_assets, &self.dynamic]
            .into_iter()
            .map(GenerationId::name)
            .collect()
    }
}

/// An opened generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheGeneration {
    pub name: String,
    pub created_at: String,
}

impl CacheDb {
    /// Open a generation by identity, creating it if absent.
    pub async fn open_id(&self, id: &GenerationId) -> Result<CacheGeneration, Error> {
        self.open_generation(&id.name()).await
    }

    /// Open a generation by raw name, creating it if absent.
    ///
    /// Idempotent: an existing generation keeps its entries and creation time.
    pub async fn open_generation(&self, name: &str) -> Result<CacheGeneration, Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<CacheGeneration, Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                let created_at: String = conn.query_row(
                    "SELECT created_at FROM generations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(CacheGeneration { name, created_at })
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a generation with this name exists.
    pub async fn has_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and its entries.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation whose name is not in `current`.
    ///
    /// Runs in a single transaction: either every stale generation is gone or
    /// none is. Returns the deleted names in creation order.
    pub async fn evict_stale(&self, current: &HashSet<String>) -> Result<Vec<String>, Error> {
        let current = current.clone();
        let evicted = self
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let names = {
                    let mut stmt = tx.prepare("SELECT name FROM generations ORDER BY rowid ASC")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<String>, rusqlite::Error>>()?
                };

                let stale: Vec<String> = names.into_iter().filter(|n| !current.contains(n)).collect();
                for name in &stale {
                    tx.execute("DELETE FROM entries WHERE generation = ?1", params![name])?;
                    tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                }
                tx.commit()?;
                Ok(stale)
            })
            .await
            .map_err(Error::from)?;

        for name in &evicted {
            tracing::info!(generation = %name, "deleted stale cache generation");
        }

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestKey, Response};
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::new("GET", &Url::parse("https://app.example").unwrap().join(path).unwrap())
    }

    #[test]
    fn test_generation_name_encoding() {
        assert_eq!(GenerationId::new("fa", Role::Combined, "v2.0.0").name(), "fa-v2.0.0");
        assert_eq!(GenerationId::new("fa", Role::Static, "v1").name(), "fa-static-v1");
        assert_eq!(GenerationId::new("fa", Role::Dynamic, "v1").name(), "fa-dynamic-v1");
    }

    #[test]
    fn test_current_names() {
        let names = CacheNames {
            combined: GenerationId::new("fa", Role::Combined, "v2"),
            static_assets: GenerationId::new("fa", Role::Static, "v1"),
            dynamic: GenerationId::new("fa", Role::Dynamic, "v1"),
        };
        let current = names.current_names();
        assert_eq!(current.len(), 3);
        assert!(current.contains("fa-v2"));
        assert!(current.contains("fa-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let id = GenerationId::new("fa", Role::Dynamic, "v1");

        let first = db.open_id(&id).await.unwrap();
        db.put(&first.name, &key("/a"), &Response::new(200, "OK", "a")).await.unwrap();

        let second = db.open_id(&id).await.unwrap();
        assert_eq!(first, second);
        assert!(db.match_in(&second.name, &key("/a")).await.unwrap().is_some());
        assert_eq!(db.generation_names().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evict_stale_keeps_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["legacy", "static-v1", "dynamic-v1", "old-v0"] {
            db.open_generation(name).await.unwrap();
            db.put(name, &key("/"), &Response::new(200, "OK", name)).await.unwrap();
        }

        let current: HashSet<String> = ["static-v1".to_string(), "dynamic-v1".to_string()].into();
        let evicted = db.evict_stale(&current).await.unwrap();

        assert_eq!(evicted, vec!["legacy".to_string(), "old-v0".to_string()]);
        assert_eq!(db.generation_names().await.unwrap(), vec!["static-v1".to_string(), "dynamic-v1".to_string()]);
        assert!(db.match_in("old-v0", &key("/")).await.unwrap().is_none());
        assert!(db.match_in("static-v1", &key("/")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_evict_stale_nothing_to_do() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("static-v1").await.unwrap();
        let current: HashSet<String> = ["static-v1".to_string()].into();
        assert!(db.evict_stale(&current).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("dynamic-v1").await.unwrap();
        assert!(db.delete_generation("dynamic-v1").await.unwrap());
        assert!(!db.delete_generation("dynamic-v1").await.unwrap());
        assert!(!db.has_generation("dynamic-v1").await.unwrap());
    }
}
