//! Key/value store shared with the host application.
//!
//! Mirrors a suite-scoped preferences store: values are staged in memory with
//! [`SharedStore::set`] / [`SharedStore::remove`] and become visible to the
//! other process on [`SharedStore::synchronize`].

use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    /// Persist staged changes so the other process can read them.
    async fn synchronize(&self) -> Result<()>;
}

/// Opens the shared store that lives in a storage root.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self, storage_root: &Path) -> Result<Arc<dyn SharedStore>>;
}

// ── JSON file-backed implementation ──────────────────────────────────

/// Stores all keys as one JSON object at the given path.
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open for writing, loading any values already present.
    ///
    /// Fails if the file cannot be created or written. An existing file that
    /// does not hold a JSON object is replaced on the next synchronize.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&target)
                .map(drop)
                .map_err(|e| StoreError::io(&target, e))
        })
        .await
        .map_err(|e| StoreError::io(&path, std::io::Error::other(e)))??;

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        let values = if raw.trim().is_empty() {
            BTreeMap::new()
        } else {
            match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable shared store");
                    BTreeMap::new()
                },
            }
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SharedStore for JsonFileStore {
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    async fn synchronize(&self) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.snapshot())?;
        // Write-then-rename so the host never reads a torn file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        debug!(path = %self.path.display(), bytes = data.len(), "synchronized shared store");
        Ok(())
    }
}

/// Opens `<storage_root>/<file_stem>.json`.
#[derive(Debug, Clone)]
pub struct JsonStoreOpener {
    file_stem: String,
}

impl JsonStoreOpener {
    pub fn new(file_stem: impl Into<String>) -> Self {
        Self {
            file_stem: file_stem.into(),
        }
    }

    pub fn store_path(&self, storage_root: &Path) -> PathBuf {
        storage_root.join(format!("{}.json", self.file_stem))
    }
}

#[async_trait]
impl StoreOpener for JsonStoreOpener {
    async fn open(&self, storage_root: &Path) -> Result<Arc<dyn SharedStore>> {
        let store = JsonFileStore::open(self.store_path(storage_root)).await?;
        Ok(Arc::new(store))
    }
}
