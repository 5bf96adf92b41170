//! User preferences and notification settings.

use serde::{Deserialize, Serialize};

/// Colour scheme of the front end.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Persisted user preferences.
///
/// Missing fields take their defaults so documents written by older builds
/// stay readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: Theme,
    pub notifications_enabled: bool,
    pub daily_reminder_enabled: bool,
    pub daily_reminder_seconds: u64,
    pub daily_reminder_notification_id: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            notifications_enabled: true,
            daily_reminder_enabled: false,
            daily_reminder_seconds: 24 * 60 * 60,
            daily_reminder_notification_id: None,
        }
    }
}
