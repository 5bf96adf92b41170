// src/models/mod.rs

//! Domain models for the book discovery client.
//!
//! Catalog records, configuration, and persisted preferences.

mod author;
mod book;
mod config;
mod preferences;

// Re-export all public types
pub use author::{AuthorDetails, AuthorWorkEntry, AuthorWorksResponse};
pub use book::{
    AuthorRef, Book, BookDetails, CatalogLink, CatalogText, KeyRef, SearchResponse,
    work_id_from_key,
};
pub use config::{
    CatalogConfig, Config, LoggingConfig, NotificationConfig, PolicyOverride, QueryConfig,
};
pub use preferences::{Preferences, Theme};
