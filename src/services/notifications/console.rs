//! Notification platform for terminal use.
//!
//! Immediate notifications are written to the log. Scheduled ones are kept in
//! a registry document in storage, so they survive between runs and can be
//! listed and cancelled later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use super::{NotificationContent, NotificationPlatform, PermissionStatus, PlatformNotification, Trigger};
use crate::error::{AppError, Result};
use crate::storage::{JsonStoreExt, KeyValueStore};

/// Storage key of the console schedule registry.
pub const REGISTRY_KEY: &str = "console_notifications";

/// Length of generated notification ids, in hex characters.
const ID_LEN: usize = 16;

pub struct ConsolePlatform {
    storage: Arc<dyn KeyValueStore>,
    grant_permission: bool,
    status: Mutex<PermissionStatus>,
    counter: AtomicU64,
    registry: tokio::sync::Mutex<()>,
}

impl ConsolePlatform {
    /// `grant_permission` is the answer given when permission is requested.
    pub fn new(storage: Arc<dyn KeyValueStore>, grant_permission: bool) -> Self {
        Self {
            storage,
            grant_permission,
            status: Mutex::new(PermissionStatus::Undetermined),
            counter: AtomicU64::new(0),
            registry: tokio::sync::Mutex::new(()),
        }
    }

    /// Derive a fresh id from the content, the clock and a counter.
    fn next_id(&self, content: &NotificationContent, trigger: Trigger) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.title.as_bytes());
        hasher.update(content.body.as_bytes());
        hasher.update(format!("{trigger:?}").as_bytes());
        hasher.update(
            Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        hasher.update(self.counter.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        let mut id = hex::encode(hasher.finalize());
        id.truncate(ID_LEN);
        id
    }

    async fn load(&self) -> Result<Vec<PlatformNotification>> {
        Ok(self.storage.get_json(REGISTRY_KEY).await?.unwrap_or_default())
    }

    async fn store(&self, registry: &[PlatformNotification]) -> Result<()> {
        if registry.is_empty() {
            return self.storage.remove(REGISTRY_KEY).await;
        }
        self.storage.set_json(REGISTRY_KEY, &registry).await
    }
}

#[async_trait]
impl NotificationPlatform for ConsolePlatform {
    fn is_physical_device(&self) -> bool {
        true
    }

    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(*self.status.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        let answer = if self.grant_permission {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = answer;
        Ok(answer)
    }

    async fn push_token(&self) -> Result<Option<String>> {
        let mut hasher = Sha256::new();
        hasher.update(b"console-push-token");
        hasher.update(Utc::now().to_rfc3339().as_bytes());
        Ok(Some(format!(
            "ConsolePushToken[{}]",
            &hex::encode(hasher.finalize())[..22]
        )))
    }

    async fn schedule(&self, content: &NotificationContent, trigger: Trigger) -> Result<String> {
        if let Trigger::Interval { seconds: 0, .. } = trigger {
            return Err(AppError::notification("interval trigger needs at least one second"));
        }
        let id = self.next_id(content, trigger);
        if trigger == Trigger::Immediate {
            log::info!("🔔 {}: {}", content.title, content.body);
            return Ok(id);
        }

        let _registry = self.registry.lock().await;
        let mut registry = self.load().await?;
        registry.push(PlatformNotification {
            id: id.clone(),
            content: content.clone(),
            trigger,
        });
        self.store(&registry).await?;
        log::info!("Scheduled '{}' as {} ({:?})", content.title, id, trigger);
        Ok(id)
    }

    async fn cancel(&self, id: &str) -> Result<()> {
        let _registry = self.registry.lock().await;
        let mut registry = self.load().await?;
        let before = registry.len();
        registry.retain(|n| n.id != id);
        if registry.len() != before {
            self.store(&registry).await?;
        }
        Ok(())
    }

    async fn cancel_all(&self) -> Result<()> {
        let _registry = self.registry.lock().await;
        self.storage.remove(REGISTRY_KEY).await
    }

    async fn scheduled(&self) -> Result<Vec<PlatformNotification>> {
        self.load().await
    }
}
