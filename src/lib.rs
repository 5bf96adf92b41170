//! Bookworm: book discovery client library.
//!
//! Searches the Open Library catalog through a cached query layer, keeps
//! favorites and recent searches in local storage, and schedules reading
//! reminders.

pub mod context;
pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use context::AppContext;
