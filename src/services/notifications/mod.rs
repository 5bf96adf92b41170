//! Reminder and recommendation notifications.
//!
//! `NotificationScheduler` wraps a device [`NotificationPlatform`]: it checks
//! permissions, keeps one active notification per reminder slot, and tracks
//! every scheduled id in storage so it can be cancelled later. Permission
//! problems are reported as [`NotificationOutcome::Declined`], never as errors.

mod console;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::Book;
use crate::state::PreferencesStore;
use crate::storage::{JsonStoreExt, KeyValueStore};

pub use console::ConsolePlatform;

/// Storage key of the tracked notification records.
pub const SCHEDULED_IDS_KEY: &str = "scheduled_notification_ids";

/// Storage key of the cached push token.
pub const PUSH_TOKEN_KEY: &str = "push_token";

/// What a notification shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl NotificationContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn daily_reminder() -> Self {
        Self::new(
            "📚 Reading Time!",
            "Don't forget to spend some time with your favorite books today.",
        )
    }

    pub fn goal_reminder() -> Self {
        Self::new(
            "🎯 Weekly Reading Goal",
            "How are you doing with your reading goal this week?",
        )
    }

    pub fn book_recommendation(book: &Book) -> Self {
        Self {
            title: "📖 New Book Recommendation".to_string(),
            body: format!("Check out \"{}\" by {}", book.title, book.authors_display()),
            data: serde_json::json!({
                "type": "book_recommendation",
                "book": book,
            }),
        }
    }
}

/// When a notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Immediate,
    Interval {
        seconds: u64,
        repeats: bool,
    },
    /// `weekday` is 1 (Sunday) to 7; `None` fires every day
    Calendar {
        #[serde(default)]
        weekday: Option<u8>,
        hour: u8,
        minute: u8,
        repeats: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// A notification the platform still has scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformNotification {
    pub id: String,
    pub content: NotificationContent,
    pub trigger: Trigger,
}

/// Device notification subsystem.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Whether notifications can be delivered at all on this device.
    fn is_physical_device(&self) -> bool;

    async fn permission_status(&self) -> Result<PermissionStatus>;

    /// Ask the user for permission; returns the resulting status.
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Issue a push token, if the platform supports push.
    async fn push_token(&self) -> Result<Option<String>>;

    /// Schedule a notification and return its platform id.
    async fn schedule(&self, content: &NotificationContent, trigger: Trigger) -> Result<String>;

    /// Cancel one notification. Unknown ids are ignored.
    async fn cancel(&self, id: &str) -> Result<()>;

    async fn cancel_all(&self) -> Result<()>;

    async fn scheduled(&self) -> Result<Vec<PlatformNotification>>;
}

/// Logical reminder a notification fills; each slot has at most one active
/// notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderSlot {
    DailyReminder,
    GoalReminder,
}

/// A tracked scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotificationRecord {
    pub id: String,
    #[serde(default)]
    pub slot: Option<ReminderSlot>,
    pub scheduled_at: DateTime<Utc>,
}

/// Tracked entry as stored; older builds stored bare ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Record(ScheduledNotificationRecord),
    Id(String),
}

impl From<StoredRecord> for ScheduledNotificationRecord {
    fn from(stored: StoredRecord) -> Self {
        match stored {
            StoredRecord::Record(record) => record,
            StoredRecord::Id(id) => ScheduledNotificationRecord {
                id,
                slot: None,
                scheduled_at: DateTime::<Utc>::default(),
            },
        }
    }
}

/// Why a notification was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    NotPhysicalDevice,
    PermissionDenied,
    NotificationsDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Accepted by the platform under this id
    Scheduled(String),
    Declined(DeclineReason),
}

impl NotificationOutcome {
    pub fn id(&self) -> Option<&str> {
        match self {
            NotificationOutcome::Scheduled(id) => Some(id),
            NotificationOutcome::Declined(_) => None,
        }
    }
}

/// Schedules, tracks and cancels notifications.
pub struct NotificationScheduler {
    platform: Arc<dyn NotificationPlatform>,
    storage: Arc<dyn KeyValueStore>,
    preferences: Arc<PreferencesStore>,
    /// Serializes read-modify-write cycles on the tracked records
    records: Mutex<()>,
}

impl NotificationScheduler {
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        storage: Arc<dyn KeyValueStore>,
        preferences: Arc<PreferencesStore>,
    ) -> Self {
        Self {
            platform,
            storage,
            preferences,
            records: Mutex::new(()),
        }
    }

    /// Request permission if needed; returns why notifications can't be
    /// sent, or `None` when they can.
    async fn check_permission(&self) -> Result<Option<DeclineReason>> {
        if !self.platform.is_physical_device() {
            log::warn!("Notifications only work on physical devices");
            return Ok(Some(DeclineReason::NotPhysicalDevice));
        }

        let mut status = self.platform.permission_status().await?;
        if status != PermissionStatus::Granted {
            status = self.platform.request_permission().await?;
        }
        if status != PermissionStatus::Granted {
            log::warn!("Permission not granted for notifications");
            return Ok(Some(DeclineReason::PermissionDenied));
        }
        Ok(None)
    }

    /// Ask for notification permission. Returns whether it was granted.
    pub async fn request_permissions(&self) -> Result<bool> {
        Ok(self.check_permission().await?.is_none())
    }

    /// Push token, cached in storage after the first issue.
    pub async fn push_token(&self) -> Result<Option<String>> {
        let stored: Option<String> = self.storage.get_json(PUSH_TOKEN_KEY).await?;
        if let Some(token) = stored {
            return Ok(Some(token));
        }
        if !self.platform.is_physical_device() {
            log::warn!("Push tokens require a physical device");
            return Ok(None);
        }

        let token = self.platform.push_token().await?;
        if let Some(token) = &token {
            self.storage.set_json(PUSH_TOKEN_KEY, token).await?;
        }
        Ok(token)
    }

    /// Request permission and, when granted, obtain the push token.
    pub async fn initialize(&self) -> Result<Option<String>> {
        if !self.request_permissions().await? {
            return Ok(None);
        }
        let token = self.push_token().await?;
        match &token {
            Some(token) => log::info!("Push token: {}", token),
            None => log::info!("No push token issued"),
        }
        Ok(token)
    }

    /// Schedule the repeating daily reminder, replacing any active one.
    pub async fn schedule_recurring(&self, interval_secs: u64) -> Result<NotificationOutcome> {
        if interval_secs == 0 {
            return Err(AppError::validation("reminder interval must be at least one second"));
        }
        let outcome = self
            .schedule_tracked(
                &NotificationContent::daily_reminder(),
                Trigger::Interval {
                    seconds: interval_secs,
                    repeats: true,
                },
                Some(ReminderSlot::DailyReminder),
            )
            .await?;

        if let NotificationOutcome::Scheduled(id) = &outcome {
            self.preferences.set_daily_reminder(interval_secs, id).await?;
            log::info!("Daily reminder {} every {}s", id, interval_secs);
        }
        Ok(outcome)
    }

    /// Schedule the weekly goal reminder (Sundays at 10:00).
    pub async fn schedule_goal_reminder(&self) -> Result<NotificationOutcome> {
        self.schedule_tracked(
            &NotificationContent::goal_reminder(),
            Trigger::Calendar {
                weekday: Some(1),
                hour: 10,
                minute: 0,
                repeats: true,
            },
            Some(ReminderSlot::GoalReminder),
        )
        .await
    }

    /// Schedule a tracked notification outside the reminder slots.
    pub async fn schedule(
        &self,
        content: &NotificationContent,
        trigger: Trigger,
    ) -> Result<NotificationOutcome> {
        self.schedule_tracked(content, trigger, None).await
    }

    /// Deliver a notification now. Not tracked.
    pub async fn send_immediate(&self, content: &NotificationContent) -> Result<NotificationOutcome> {
        if let Some(reason) = self.decline_reason().await? {
            return Ok(NotificationOutcome::Declined(reason));
        }
        let id = self.platform.schedule(content, Trigger::Immediate).await?;
        Ok(NotificationOutcome::Scheduled(id))
    }

    pub async fn send_book_recommendation(&self, book: &Book) -> Result<NotificationOutcome> {
        self.send_immediate(&NotificationContent::book_recommendation(book))
            .await
    }

    /// Cancel one notification. Unknown ids are a no-op.
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let _records = self.records.lock().await;
        self.platform.cancel(id).await?;

        let mut records = self.load_records().await?;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(());
        };
        let record = records.remove(index);
        self.store_records(&records).await?;

        if record.slot == Some(ReminderSlot::DailyReminder) {
            self.preferences.clear_daily_reminder().await?;
        }
        log::info!("Cancelled notification {}", id);
        Ok(())
    }

    /// Cancel every scheduled notification and forget the tracked ids.
    pub async fn cancel_all(&self) -> Result<()> {
        let _records = self.records.lock().await;
        let records = self.load_records().await?;
        self.platform.cancel_all().await?;
        self.storage.remove(SCHEDULED_IDS_KEY).await?;

        if self.preferences.daily_reminder().notification_id.is_some() {
            self.preferences.clear_daily_reminder().await?;
        }
        log::info!("Cancelled {} tracked notification(s)", records.len());
        Ok(())
    }

    /// Notifications the platform still has scheduled.
    pub async fn scheduled(&self) -> Result<Vec<PlatformNotification>> {
        self.platform.scheduled().await
    }

    /// Tracked notification records.
    pub async fn tracked(&self) -> Result<Vec<ScheduledNotificationRecord>> {
        self.load_records().await
    }

    /// Forget tracked ids the platform no longer knows. Returns how many
    /// were dropped.
    pub async fn reconcile(&self) -> Result<usize> {
        let _records = self.records.lock().await;
        let live: HashSet<String> = self
            .platform
            .scheduled()
            .await?
            .into_iter()
            .map(|n| n.id)
            .collect();

        let records = self.load_records().await?;
        let (kept, dropped): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| live.contains(&r.id));
        if dropped.is_empty() {
            return Ok(0);
        }
        self.store_records(&kept).await?;

        if dropped
            .iter()
            .any(|r| r.slot == Some(ReminderSlot::DailyReminder))
        {
            self.preferences.clear_daily_reminder().await?;
        }
        log::info!("Dropped {} stale notification id(s)", dropped.len());
        Ok(dropped.len())
    }

    /// Turn notifications on or off. Turning them off cancels everything.
    pub async fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.preferences.set_notifications_enabled(enabled).await?;
        if !enabled {
            self.cancel_all().await?;
        }
        Ok(())
    }

    async fn decline_reason(&self) -> Result<Option<DeclineReason>> {
        if !self.preferences.notifications_enabled() {
            return Ok(Some(DeclineReason::NotificationsDisabled));
        }
        self.check_permission().await
    }

    async fn schedule_tracked(
        &self,
        content: &NotificationContent,
        trigger: Trigger,
        slot: Option<ReminderSlot>,
    ) -> Result<NotificationOutcome> {
        if let Some(reason) = self.decline_reason().await? {
            log::info!("Not scheduling '{}': {:?}", content.title, reason);
            return Ok(NotificationOutcome::Declined(reason));
        }

        let _records = self.records.lock().await;
        let records = self.load_records().await?;

        // The replacement goes in first; a failure leaves the active one alone
        let id = self.platform.schedule(content, trigger).await?;

        let mut records = match slot {
            Some(slot) => self.replace_slot(slot, records).await,
            None => records,
        };
        records.push(ScheduledNotificationRecord {
            id: id.clone(),
            slot,
            scheduled_at: Utc::now(),
        });
        self.store_records(&records).await?;
        Ok(NotificationOutcome::Scheduled(id))
    }

    /// Cancel whatever fills `slot` and return the records left over.
    ///
    /// The daily reminder id mirrored in preferences counts as filling the
    /// slot even when it is tracked as a bare id or not tracked at all.
    /// Records whose cancellation fails are kept.
    async fn replace_slot(
        &self,
        slot: ReminderSlot,
        records: Vec<ScheduledNotificationRecord>,
    ) -> Vec<ScheduledNotificationRecord> {
        let mirrored = match slot {
            ReminderSlot::DailyReminder => self.preferences.daily_reminder().notification_id,
            ReminderSlot::GoalReminder => None,
        };
        let (previous, mut rest): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.slot == Some(slot) || mirrored.as_deref() == Some(r.id.as_str()));

        let mut targets: Vec<(String, Option<ScheduledNotificationRecord>)> = previous
            .into_iter()
            .map(|record| (record.id.clone(), Some(record)))
            .collect();
        if let Some(id) = mirrored.filter(|id| !targets.iter().any(|(target, _)| target == id)) {
            targets.push((id, None));
        }

        for (id, record) in targets {
            log::debug!("Replacing {:?} notification {}", slot, id);
            if let Err(e) = self.platform.cancel(&id).await {
                log::warn!("Failed to cancel {:?} notification {}: {}", slot, id, e);
                rest.extend(record);
            }
        }
        rest
    }

    async fn load_records(&self) -> Result<Vec<ScheduledNotificationRecord>> {
        let stored: Option<Vec<StoredRecord>> = self.storage.get_json(SCHEDULED_IDS_KEY).await?;
        Ok(stored
            .unwrap_or_default()
            .into_iter()
            .map(ScheduledNotificationRecord::from)
            .collect())
    }

    async fn store_records(&self, records: &[ScheduledNotificationRecord]) -> Result<()> {
        self.storage.set_json(SCHEDULED_IDS_KEY, &records).await
    }
}
