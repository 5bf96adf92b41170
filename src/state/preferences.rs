//! User preferences and notification settings.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Preferences, Theme};
use crate::state::persist::PersistedCell;
use crate::storage::KeyValueStore;

/// Storage key of the preferences document.
pub const PREFERENCES_KEY: &str = "user-storage";

const PREFERENCES_VERSION: u32 = 0;

/// Active daily reminder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReminder {
    pub enabled: bool,
    pub interval_secs: u64,
    pub notification_id: Option<String>,
}

/// Persisted store of user preferences.
pub struct PreferencesStore {
    cell: PersistedCell<Preferences>,
}

impl PreferencesStore {
    pub async fn open(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let (cell, _) =
            PersistedCell::open(storage, PREFERENCES_KEY, PREFERENCES_VERSION).await?;
        Ok(Self { cell })
    }

    pub fn snapshot(&self) -> Preferences {
        self.cell.snapshot()
    }

    pub fn theme(&self) -> Theme {
        self.cell.read(|p| p.theme)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.cell.update(|p| p.theme = theme);
        self.cell.persist().await
    }

    pub async fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.cell.update(|p| {
            p.theme = p.theme.toggled();
            p.theme
        });
        self.cell.persist().await?;
        Ok(theme)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.cell.read(|p| p.notifications_enabled)
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.cell.update(|p| p.notifications_enabled = enabled);
        self.cell.persist().await
    }

    pub async fn toggle_notifications(&self) -> Result<bool> {
        let enabled = self.cell.update(|p| {
            p.notifications_enabled = !p.notifications_enabled;
            p.notifications_enabled
        });
        self.cell.persist().await?;
        Ok(enabled)
    }

    pub fn daily_reminder(&self) -> DailyReminder {
        self.cell.read(|p| DailyReminder {
            enabled: p.daily_reminder_enabled,
            interval_secs: p.daily_reminder_seconds,
            notification_id: p.daily_reminder_notification_id.clone(),
        })
    }

    /// Record a newly scheduled daily reminder.
    pub async fn set_daily_reminder(&self, interval_secs: u64, notification_id: &str) -> Result<()> {
        self.cell.update(|p| {
            p.daily_reminder_enabled = true;
            p.daily_reminder_seconds = interval_secs;
            p.daily_reminder_notification_id = Some(notification_id.to_string());
        });
        self.cell.persist().await
    }

    /// Forget the daily reminder, keeping its interval for next time.
    pub async fn clear_daily_reminder(&self) -> Result<()> {
        self.cell.update(|p| {
            p.daily_reminder_enabled = false;
            p.daily_reminder_notification_id = None;
        });
        self.cell.persist().await
    }
}
