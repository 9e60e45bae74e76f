//! Option store: the small key-value surface every persistent setting and the
//! summary cache live in.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

// Single cnidarium substore; every option key lives under it.
const OPTION_PREFIX: &str = "options";

fn option_key(key: &str) -> String {
    format!("{}/{}", OPTION_PREFIX, key)
}

#[async_trait]
pub trait OptionStore: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Read a JSON-encoded option, falling back to `None` when the key is absent.
pub async fn get_option<T: DeserializeOwned>(
    store: &dyn OptionStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get_raw(key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Store(format!("decode option {}: {}", key, e))),
        None => Ok(None),
    }
}

pub async fn set_option<T: Serialize + ?Sized>(
    store: &dyn OptionStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Error::Store(format!("encode option {}: {}", key, e)))?;
    store.set_raw(key, bytes).await
}

/// On-disk store backed by cnidarium.
pub struct CnidariumStore {
    storage: Storage,
}

impl CnidariumStore {
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![OPTION_PREFIX.to_string()])
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }

    async fn commit(&self, delta: StateDelta<cnidarium::Snapshot>) -> Result<()> {
        self.storage
            .commit(delta)
            .await
            .map(|_| ())
            .map_err(|e| Error::Store(e.to_string()))
    }
}

#[async_trait]
impl OptionStore for CnidariumStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let snapshot = self.storage.latest_snapshot();
        snapshot
            .get_raw(&option_key(key))
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let size = value.len();
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.put_raw(option_key(key), value);
        self.commit(delta).await?;
        debug!(key, size, "option stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.delete(option_key(key));
        self.commit(delta).await?;
        debug!(key, "option deleted");
        Ok(())
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    options: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OptionStore for MemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.options.read().await.get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.options.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.options.write().await.remove(key);
        Ok(())
    }
}
