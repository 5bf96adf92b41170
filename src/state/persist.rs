//! Persisted state cell shared by the client state stores.
//!
//! Reads and mutations hit an in-memory copy synchronously; persistence writes
//! the whole state as one JSON document:
//!
//! ```text
//! {"state": { ... }, "version": 0}
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::{JsonStoreExt, KeyValueStore};

/// On-disk wrapper around a store's state.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope<S> {
    pub state: S,
    #[serde(default)]
    pub version: u32,
}

/// Outcome of reading the persisted document at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hydration {
    /// A document was found and decoded
    Restored { version: u32 },
    /// No document under the key
    Missing,
    /// A document was found but could not be decoded
    Corrupt,
}

/// In-memory state with write-through persistence under one storage key.
pub(crate) struct PersistedCell<S> {
    storage: Arc<dyn KeyValueStore>,
    key: &'static str,
    version: u32,
    state: RwLock<S>,
    writer: Mutex<()>,
}

impl<S> PersistedCell<S>
where
    S: Clone + Default + Serialize + DeserializeOwned + Send + Sync,
{
    /// Load the document under `key`.
    ///
    /// A corrupt document is logged and replaced by the default state;
    /// a failing backend is returned as an error.
    pub async fn open(
        storage: Arc<dyn KeyValueStore>,
        key: &'static str,
        version: u32,
    ) -> Result<(Self, Hydration)> {
        let (state, hydration) = match storage.get(key).await? {
            None => (S::default(), Hydration::Missing),
            Some(raw) => match serde_json::from_str::<Envelope<S>>(&raw) {
                Ok(envelope) => {
                    if envelope.version > version {
                        log::warn!(
                            "'{}' was written by a newer build (version {} > {}), reading known fields only",
                            key,
                            envelope.version,
                            version
                        );
                    }
                    (
                        envelope.state,
                        Hydration::Restored {
                            version: envelope.version,
                        },
                    )
                }
                Err(e) => {
                    log::warn!("Discarding unreadable '{}' document: {}", key, e);
                    (S::default(), Hydration::Corrupt)
                }
            },
        };

        let cell = Self {
            storage,
            key,
            version,
            state: RwLock::new(state),
            writer: Mutex::new(()),
        };
        Ok((cell, hydration))
    }

    /// Read the current state.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Transform the current state in one uninterrupted step.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }

    /// Write the newest state to storage.
    ///
    /// Writers are serialized and each one snapshots the state after taking
    /// the writer lock, so the last completed write always holds the latest
    /// state. Failures are logged and returned; the in-memory state is kept.
    pub async fn persist(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let envelope = Envelope {
            state: self.snapshot(),
            version: self.version,
        };
        self.storage
            .set_json(self.key, &envelope)
            .await
            .inspect_err(|e| log::error!("Failed to persist '{}': {}", self.key, e))
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        #[serde(default)]
        value: u32,
    }

    #[tokio::test]
    async fn test_missing_then_restored() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
        let (cell, hydration) = PersistedCell::<Counter>::open(Arc::clone(&storage), "counter", 0)
            .await
            .unwrap();
        assert_eq!(hydration, Hydration::Missing);

        cell.update(|c| c.value = 7);
        cell.persist().await.unwrap();

        let (reopened, hydration) = PersistedCell::<Counter>::open(storage, "counter", 0)
            .await
            .unwrap();
        assert_eq!(hydration, Hydration::Restored { version: 0 });
        assert_eq!(reopened.snapshot().value, 7);
    }

    #[tokio::test]
    async fn test_corrupt_document_resets() {
        let storage: Arc<dyn KeyValueStore> =
            Arc::new(MemoryStorage::with_values([("counter", "][")]));
        let (cell, hydration) = PersistedCell::<Counter>::open(storage, "counter", 0)
            .await
            .unwrap();
        assert_eq!(hydration, Hydration::Corrupt);
        assert_eq!(cell.snapshot(), Counter::default());
    }

    #[tokio::test]
    async fn test_envelope_layout() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
        let (cell, _) = PersistedCell::<Counter>::open(Arc::clone(&storage), "counter", 3)
            .await
            .unwrap();
        cell.persist().await.unwrap();

        let raw = storage.get("counter").await.unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["state"]["value"], 0);
    }
}
