//! Key-value blob storage.
//!
//! Every record collection lives under a single key as one serialized JSON
//! list. Backends only need to move opaque strings in and out; typed access
//! is layered on top by [`Collection`].

pub mod collection;

pub use collection::{Collection, Record};

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use actix_web::rt::task::{JoinError, spawn_blocking};
use derive_more::{Display, From};
use sqlx::MySqlPool;
use tracing::{debug, info};

#[derive(Debug, Display, From)]
pub enum StoreError {
    #[display(fmt = "storage io error: {}", _0)]
    Io(std::io::Error),

    #[display(fmt = "storage database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "collection '{}' is corrupt: {}", key, source)]
    #[from(ignore)]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[display(fmt = "storage task failed: {}", _0)]
    Task(JoinError),

    #[display(fmt = "storage lock poisoned")]
    #[from(ignore)]
    Poisoned,
}

impl std::error::Error for StoreError {}

pub enum BlobStore {
    Memory(RwLock<HashMap<String, String>>),
    File { dir: PathBuf },
    MySql(MySqlPool),
}

impl BlobStore {
    pub fn memory() -> Self {
        BlobStore::Memory(RwLock::new(HashMap::new()))
    }

    /// One `<key>.json` file per key inside `dir`, created if missing.
    pub fn file(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Using file blob store");
        Ok(BlobStore::File { dir })
    }

    pub async fn mysql(database_url: &str) -> Result<Self, StoreError> {
        let pool = MySqlPool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                k VARCHAR(191) NOT NULL PRIMARY KEY,
                v LONGTEXT NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
                    ON UPDATE CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Using mysql blob store");
        Ok(BlobStore::MySql(pool))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            BlobStore::Memory(map) => {
                let map = map.read().map_err(|_| StoreError::Poisoned)?;
                Ok(map.get(key).cloned())
            }
            BlobStore::File { dir } => {
                let path = blob_path(dir, key);
                spawn_blocking(move || match std::fs::read_to_string(&path) {
                    Ok(s) => Ok(Some(s)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(StoreError::Io(e)),
                })
                .await?
            }
            BlobStore::MySql(pool) => {
                let value = sqlx::query_scalar::<_, String>("SELECT v FROM kv_store WHERE k = ?")
                    .bind(key)
                    .fetch_optional(pool)
                    .await?;
                Ok(value)
            }
        }
    }

    pub async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        debug!(key, bytes = value.len(), "Writing blob");
        match self {
            BlobStore::Memory(map) => {
                let mut map = map.write().map_err(|_| StoreError::Poisoned)?;
                map.insert(key.to_string(), value);
                Ok(())
            }
            BlobStore::File { dir } => {
                let dir = dir.clone();
                let key = key.to_string();
                spawn_blocking(move || write_atomic(&dir, &key, value.as_bytes())).await?
            }
            BlobStore::MySql(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO kv_store (k, v) VALUES (?, ?)
                    ON DUPLICATE KEY UPDATE v = VALUES(v)
                    "#,
                )
                .bind(key)
                .bind(value)
                .execute(pool)
                .await?;
                Ok(())
            }
        }
    }
}

fn blob_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Writes to a sibling temp file and renames it over the target.
fn write_atomic(dir: &Path, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let target = blob_path(dir, key);
    let tmp = dir.join(format!(".{key}.json.{}.tmp", uuid::Uuid::new_v4()));

    let mut file = std::fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    if let Err(e) = std::fs::rename(&tmp, &target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn memory_store_roundtrips_values() {
        let store = BlobStore::memory();
        assert_eq!(store.get("messages").await.unwrap(), None);

        store.put("messages", "[]".to_string()).await.unwrap();
        store.put("messages", "[1]".to_string()).await.unwrap();
        assert_eq!(store.get("messages").await.unwrap().as_deref(), Some("[1]"));
    }

    #[actix_web::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = BlobStore::file(dir.path()).unwrap();
        assert_eq!(store.get("leave_requests").await.unwrap(), None);
        store.put("leave_requests", r#"[{"id":1}]"#.to_string()).await.unwrap();

        let reopened = BlobStore::file(dir.path()).unwrap();
        assert_eq!(
            reopened.get("leave_requests").await.unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );

        // no temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_store_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        BlobStore::file(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
