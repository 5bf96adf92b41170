//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::query::QueryFamily;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalog connection settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Cached query behaviour
    #[serde(default)]
    pub queries: QueryConfig,

    /// Reminder defaults
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.catalog.base_url)?;
        if self.catalog.user_agent.trim().is_empty() {
            return Err(AppError::validation("catalog.user_agent is empty"));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(AppError::validation("catalog.timeout_secs must be > 0"));
        }
        if self.catalog.search_limit == 0 {
            return Err(AppError::validation("catalog.search_limit must be > 0"));
        }
        if self.catalog.author_works_limit == 0 {
            return Err(AppError::validation(
                "catalog.author_works_limit must be > 0",
            ));
        }
        if self.notifications.daily_reminder_secs == 0 {
            return Err(AppError::validation(
                "notifications.daily_reminder_secs must be > 0",
            ));
        }
        for (family, policy) in &self.queries.policies {
            if let (Some(base), Some(cap)) = (policy.backoff_base_ms, policy.backoff_cap_ms) {
                if cap < base {
                    return Err(AppError::validation(format!(
                        "queries.policies.{family}: backoff_cap_ms is below backoff_base_ms"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Remote catalog connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Number of results requested per search
    #[serde(default = "defaults::search_limit")]
    pub search_limit: u32,

    /// Number of works requested per author bibliography
    #[serde(default = "defaults::author_works_limit")]
    pub author_works_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            search_limit: defaults::search_limit(),
            author_works_limit: defaults::author_works_limit(),
        }
    }
}

/// Cached query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Search text must be longer than this many characters to run
    #[serde(default = "defaults::min_search_length")]
    pub min_search_length: usize,

    /// Per-family policy overrides; unspecified fields keep the defaults
    #[serde(default)]
    pub policies: BTreeMap<QueryFamily, PolicyOverride>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            min_search_length: defaults::min_search_length(),
            policies: BTreeMap::new(),
        }
    }
}

/// Partial query policy read from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyOverride {
    #[serde(default)]
    pub stale_secs: Option<u64>,
    #[serde(default)]
    pub gc_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub backoff_base_ms: Option<u64>,
    #[serde(default)]
    pub backoff_cap_ms: Option<u64>,
}

/// Reminder defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Interval of the daily reading reminder
    #[serde(default = "defaults::daily_reminder")]
    pub daily_reminder_secs: u64,

    /// Whether the console platform grants notification permission
    #[serde(default = "defaults::console_permission")]
    pub console_permission: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            daily_reminder_secs: defaults::daily_reminder(),
            console_permission: defaults::console_permission(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Catalog defaults
    pub fn base_url() -> String {
        "https://openlibrary.org".into()
    }
    pub fn user_agent() -> String {
        "bookworm/0.1 (+https://openlibrary.org/developers/api)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn search_limit() -> u32 {
        20
    }
    pub fn author_works_limit() -> u32 {
        50
    }

    // Query defaults
    pub fn min_search_length() -> usize {
        2
    }

    // Notification defaults
    pub fn daily_reminder() -> u64 {
        24 * 60 * 60
    }
    pub fn console_permission() -> bool {
        true
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
