//! Device key-value storage.
//!
//! Every persisted record is a JSON document stored under a stable string key:
//!
//! ```text
//! storage/
//! ├── config.toml                      # Client configuration
//! ├── book-storage.json                # Favorites + recent searches
//! ├── user-storage.json                # Preferences + reminder settings
//! ├── scheduled_notification_ids.json  # Tracked notification ids
//! ├── push_token.json                  # Cached push token
//! └── console_notifications.json       # Console platform registry
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{AppError, Result};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Space used by the stored documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Total size of all stored values in bytes
    pub used_bytes: usize,
    /// Every key currently present
    pub keys: Vec<String>,
}

/// Trait for string-keyed storage backends.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, returning None if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every value.
    async fn clear(&self) -> Result<()>;

    /// List every key.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Read several keys at once.
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<(String, Option<String>)>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push((key.to_string(), self.get(key).await?));
        }
        Ok(values)
    }

    /// Write several keys at once.
    async fn multi_set(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Compute the space used by every stored value.
    async fn usage(&self) -> Result<StorageUsage> {
        let keys = self.keys().await?;
        let mut used_bytes = 0;
        for key in &keys {
            if let Some(value) = self.get(key).await? {
                used_bytes += value.len();
            }
        }
        Ok(StorageUsage { used_bytes, keys })
    }
}

/// JSON helpers available on every [`KeyValueStore`].
#[async_trait]
pub trait JsonStoreExt: KeyValueStore {
    /// Read and decode a JSON document.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| AppError::storage(key, format!("invalid JSON document: {e}"))),
            None => Ok(None),
        }
    }

    /// Encode and write a JSON document.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

impl<S: KeyValueStore + ?Sized> JsonStoreExt for S {}

/// Check that a key is safe to use as a file name.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::storage(key, "invalid storage key"))
    }
}
