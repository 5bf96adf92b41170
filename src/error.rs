// src/error.rs

//! Unified error handling for the book discovery client.

use std::fmt;

use thiserror::Error;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Device storage read/write failed
    #[error("Storage error for '{key}': {message}")]
    Storage { key: String, message: String },

    /// Catalog request failed without retries
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Cached query exhausted its retries
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Notification platform failure
    #[error("Notification error: {0}")]
    Notification(String),

    /// Favorites backing request failed (after compensation)
    #[error("Favorites sync failed: {0}")]
    Sync(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a storage error for a key.
    pub fn storage(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error.
    pub fn notification(message: impl fmt::Display) -> Self {
        Self::Notification(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Catalog endpoint that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    Trending,
    Classics,
    Subject,
    Work,
    Author,
    AuthorWorks,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Endpoint::Search => "Failed to search books",
            Endpoint::Trending => "Failed to fetch trending books",
            Endpoint::Classics => "Failed to fetch classic books",
            Endpoint::Subject => "Failed to fetch books by subject",
            Endpoint::Work => "Failed to fetch book details",
            Endpoint::Author => "Failed to fetch author details",
            Endpoint::AuthorWorks => "Failed to fetch author works",
        };
        f.write_str(message)
    }
}

/// Remote catalog failure.
///
/// Cloneable so a single failed fetch can be handed to every coalesced caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Non-success HTTP status
    #[error("{endpoint}: HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    /// Connection, timeout or body transfer failure
    #[error("{endpoint}: {message}")]
    Transport { endpoint: Endpoint, message: String },

    /// Response body did not match the expected shape
    #[error("{endpoint}: invalid response body: {message}")]
    Decode { endpoint: Endpoint, message: String },

    /// Request could not be built from the given parameters
    #[error("Invalid catalog request: {0}")]
    InvalidRequest(String),

    /// Aborted by the caller
    #[error("Request cancelled")]
    Cancelled,
}

impl CatalogError {
    /// Map a reqwest transport error for an endpoint.
    pub fn transport(endpoint: Endpoint, error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode {
                endpoint,
                message: error.to_string(),
            };
        }
        Self::Transport {
            endpoint,
            message: error.to_string(),
        }
    }

    /// Whether an automatic retry may fix this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_) | Self::Cancelled)
    }
}

/// Terminal failure of a cached query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Every attempt failed
    #[error("Query {key} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        key: String,
        attempts: u32,
        source: CatalogError,
    },
}

impl QueryError {
    /// The last catalog error seen before giving up.
    pub fn catalog_error(&self) -> &CatalogError {
        match self {
            Self::Exhausted { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_endpoint() {
        let error = CatalogError::Status {
            endpoint: Endpoint::Work,
            status: 404,
        };
        assert_eq!(error.to_string(), "Failed to fetch book details: HTTP 404");
    }

    #[test]
    fn cancellation_is_not_retryable() {
        assert!(!CatalogError::Cancelled.is_retryable());
        assert!(!CatalogError::InvalidRequest("empty id".into()).is_retryable());
        assert!(
            CatalogError::Status {
                endpoint: Endpoint::Search,
                status: 503
            }
            .is_retryable()
        );
    }

    #[test]
    fn query_error_exposes_last_failure() {
        let source = CatalogError::Status {
            endpoint: Endpoint::Search,
            status: 500,
        };
        let error = QueryError::Exhausted {
            key: "books/search/dune".into(),
            attempts: 3,
            source: source.clone(),
        };
        assert_eq!(error.catalog_error(), &source);
        assert!(error.to_string().contains("3 attempt(s)"));
    }
}
