use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::bus::{ChangeBus, ChangeEvent};

/// Raw storage layout: one JSON document per key, stored as text.
pub type Entries = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn load(&self) -> Result<Entries, StoreError>;
    async fn persist(&self, entries: &Entries) -> Result<(), StoreError>;
    fn describe(&self) -> String;
}

pub struct MemoryBackend;

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Entries, StoreError> {
        Ok(Entries::new())
    }

    async fn persist(&self, _entries: &Entries) -> Result<(), StoreError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Keeps every key in a single JSON object on disk, rewritten on each commit.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn load(&self) -> Result<Entries, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Entries::new()),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Storage file {} does not exist yet, starting empty", self.path.display());
                Ok(Entries::new())
            }
            Err(e) => Err(StoreError::Persistence(e.to_string())),
        }
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        // BTreeMap keeps the file diff-friendly.
        let ordered: BTreeMap<&String, &String> = entries.iter().collect();
        let body = serde_json::to_string_pretty(&ordered)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Persistence(e.to_string()))?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, body)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Key-value store shared by every cell.
///
/// Writers are serialized through one lock. A [`Transaction`] stages its
/// writes and they are applied only when the closure succeeds, so a failed
/// check never leaves a partial write behind. Every committed key is
/// announced on the [`ChangeBus`].
#[derive(Clone)]
pub struct Database {
    entries: Arc<RwLock<Entries>>,
    backend: Arc<dyn StorageBackend>,
    bus: ChangeBus,
    version: Arc<AtomicU64>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::new())),
            backend: Arc::new(MemoryBackend),
            bus: ChangeBus::default(),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, StoreError> {
        let entries = backend.load().await?;
        info!("Opened {} store with {} keys", backend.describe(), entries.len());

        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
            backend,
            bus: ChangeBus::default(),
            version: Arc::new(AtomicU64::new(0)),
        })
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match &config.storage_path {
            Some(path) => Self::open(Arc::new(FileBackend::new(path.clone()))).await,
            None => Ok(Self::in_memory()),
        }
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn backend_name(&self) -> String {
        self.backend.describe()
    }

    /// Number of commits since the store was opened.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub async fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Reads a collection. A missing or malformed key reads as empty.
    pub async fn collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let entries = self.entries.read().await;
        parse_collection(key, entries.get(key).map(String::as_str))
    }

    pub async fn set_raw(&self, key: &str, value: impl Into<String> + Send) -> Result<(), StoreError> {
        let value = value.into();
        self.transact(move |tx| {
            tx.set_raw(key, value);
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub async fn put_collection<T: Serialize + Sync>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        self.transact(|tx| tx.put_collection(key, items)).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.transact(|tx| {
            tx.remove(key);
            Ok::<_, StoreError>(())
        })
        .await
    }

    /// Runs `f` against a consistent view of the store while holding the
    /// writer lock. Staged writes are applied and persisted only on `Ok`.
    pub async fn transact<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, E> + Send,
        E: From<StoreError>,
    {
        let mut entries = self.entries.write().await;

        let (result, staged) = {
            let mut tx = Transaction::new(&entries);
            let result = f(&mut tx)?;
            (result, tx.staged)
        };

        if staged.is_empty() {
            return Ok(result);
        }

        let mut previous = Vec::with_capacity(staged.len());
        for (key, value) in &staged {
            let old = match value {
                Some(text) => entries.insert(key.clone(), text.clone()),
                None => entries.remove(key),
            };
            previous.push((key.clone(), old));
        }

        if let Err(e) = self.backend.persist(&entries).await {
            error!("Failed to persist commit, rolling back {} key(s): {}", previous.len(), e);
            for (key, old) in previous {
                match old {
                    Some(text) => entries.insert(key, text),
                    None => entries.remove(&key),
                };
            }
            return Err(E::from(e));
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(entries);

        for key in staged.keys() {
            let receivers = self.bus.publish(ChangeEvent::new(key, version));
            debug!("Committed key '{}' at version {} ({} subscribers)", key, version, receivers);
        }

        Ok(result)
    }
}

/// Staged view over the store. Reads see the transaction's own writes.
pub struct Transaction<'a> {
    base: &'a Entries,
    staged: BTreeMap<String, Option<String>>,
}

impl<'a> Transaction<'a> {
    fn new(base: &'a Entries) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        match self.staged.get(key) {
            Some(staged) => staged.as_deref(),
            None => self.base.get(key).map(String::as_str),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    pub fn collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        parse_collection(key, self.get_raw(key))
    }

    pub fn put_collection<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let text = serde_json::to_string(items)?;
        self.set_raw(key, text);
        Ok(())
    }

    pub fn set_raw(&mut self, key: &str, value: impl Into<String>) {
        self.staged.insert(key.to_string(), Some(value.into()));
    }

    pub fn remove(&mut self, key: &str) {
        self.staged.insert(key.to_string(), None);
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }
}

fn parse_collection<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    match raw {
        None => Vec::new(),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            warn!("Malformed JSON in storage key '{}', treating it as empty: {}", key, e);
            Vec::new()
        }),
    }
}
