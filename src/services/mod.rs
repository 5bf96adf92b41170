//! Service layer for the book client.
//!
//! This module contains the business logic for:
//! - Catalog access over HTTP (`CatalogClient`)
//! - Favorite changes with rollback (`FavoriteActions`)
//! - Reminder notifications (`NotificationScheduler`)

mod catalog;
mod favorites;
pub mod notifications;

pub use catalog::{Catalog, CatalogClient, CatalogResult};
pub use favorites::{FavoriteActions, FavoritesSync, LocalOnlySync};
pub use notifications::{
    ConsolePlatform, NotificationContent, NotificationOutcome, NotificationPlatform,
    NotificationScheduler,
};
