//! Persistent key-value storage collaborator.
//!
//! The access layer serializes JSON itself; the backend only needs to
//! move strings. In the browser-hosted original this is local storage,
//! here any `KeyValueStorage` implementation can be plugged in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;

/// String-valued key-value store.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn clear(&self);
}

/// In-process backend used in tests and as a default stand-in.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .ok()
            .and_then(|map| map.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.clear();
        }
    }
}

/// Prefixes every key and adds JSON helpers on top of a raw backend.
#[derive(Clone)]
pub struct ScopedStorage {
    backend: Arc<dyn KeyValueStorage>,
    prefix: String,
}

impl ScopedStorage {
    pub fn new(backend: Arc<dyn KeyValueStorage>, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    fn compute_key(&self, key: &str) -> String {
        format!("{}-{key}", self.prefix)
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        debug!(key, "reading storage item");
        self.backend.get(&self.compute_key(key))
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_item(key)?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding unparseable storage item");
                None
            }
        }
    }

    pub fn set_item(&self, key: &str, value: impl Into<String>) {
        debug!(key, "writing storage item");
        self.backend.set(&self.compute_key(key), value.into());
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ApiError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| ApiError::Decode(format!("failed to serialize '{key}': {e}")))?;
        self.set_item(key, raw);
        Ok(())
    }

    pub fn remove_item(&self, key: &str) {
        debug!(key, "removing storage item");
        self.backend.remove(&self.compute_key(key));
    }

    pub fn clear(&self) {
        debug!("clearing storage");
        self.backend.clear();
    }
}
