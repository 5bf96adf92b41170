//! Persisted client state.
//!
//! - `LibraryStore`: favorites and recent searches (`book-storage`)
//! - `PreferencesStore`: theme and notification settings (`user-storage`)
//!
//! Both stores are constructed once and shared; see `AppContext`.

mod library;
mod mutation;
mod persist;
mod preferences;

pub use library::{LIBRARY_KEY, LibraryState, LibraryStore, Toggled};
pub use mutation::{Compensation, FavoriteMutation};
pub use preferences::{DailyReminder, PREFERENCES_KEY, PreferencesStore};
