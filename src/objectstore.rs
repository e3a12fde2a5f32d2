//! Blob storage for design images and payment screenshots.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Blob write failed for {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("Blob delete failed for {url}: {source}")]
    Delete {
        url: String,
        source: std::io::Error,
    },
}

/// Durable blob storage addressed by path, returning a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String, ObjectStoreError>;

    /// Idempotent: deleting an already-gone object succeeds.
    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError>;
}

/// Filesystem-backed store serving blobs under a public base URL.
pub struct FsObjectStore {
    root: PathBuf,
    base_url: String,
}

impl FsObjectStore {
    pub fn new(root: PathBuf, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { root, base_url }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String, ObjectStoreError> {
        let file = self.root.join(path);
        let wrap = |source| ObjectStoreError::Write {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
        }
        tokio::fs::write(&file, bytes).await.map_err(wrap)?;
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError> {
        // URLs not under our base were never ours to delete.
        let Some(path) = url.strip_prefix(&self.base_url).map(|p| p.trim_start_matches('/'))
        else {
            return Ok(());
        };
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ObjectStoreError::Delete {
                url: url.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store used by tests and the no-database dev mode.
#[derive(Default)]
pub struct MemoryObjectStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.blobs.read().await.contains_key(url)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String, ObjectStoreError> {
        let url = format!("mem://{path}");
        self.blobs.write().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError> {
        self.blobs.write().await.remove(url);
        Ok(())
    }
}
