//! Favorites and recent searches.

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::models::Book;
use crate::state::mutation::{Compensation, FavoriteMutation};
use crate::state::persist::{Hydration, PersistedCell};
use crate::storage::KeyValueStore;

/// Storage key of the library document.
pub const LIBRARY_KEY: &str = "book-storage";

/// Layout version written by this build.
const LIBRARY_VERSION: u32 = 0;

/// Keys used by the per-record layout that predates [`LIBRARY_KEY`].
const LEGACY_FAVORITES_KEY: &str = "favorites";
const LEGACY_RECENT_SEARCHES_KEY: &str = "recent_searches";

/// Favorites and recent searches.
///
/// Favorites hold at most one book per catalog key. Recent searches hold at
/// most [`LibraryState::MAX_RECENT_SEARCHES`] distinct queries, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LibraryState {
    favorites: Vec<Book>,
    recent_searches: Vec<String>,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

impl LibraryState {
    pub const MAX_RECENT_SEARCHES: usize = 10;

    pub fn favorites(&self) -> &[Book] {
        &self.favorites
    }

    pub fn recent_searches(&self) -> &[String] {
        &self.recent_searches
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.favorites.iter().position(|b| b.key == key)
    }

    pub fn is_favorite(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Append a book unless its key is already present.
    pub fn add_favorite(&mut self, book: Book) -> bool {
        if self.is_favorite(&book.key) {
            return false;
        }
        self.favorites.push(book);
        true
    }

    /// Remove the book with `key`, returning where it was.
    pub fn remove_favorite(&mut self, key: &str) -> Option<(usize, Book)> {
        let index = self.position(key)?;
        Some((index, self.favorites.remove(index)))
    }

    pub(crate) fn insert_favorite_at(&mut self, index: usize, book: Book) {
        if self.is_favorite(&book.key) {
            return;
        }
        let index = index.min(self.favorites.len());
        self.favorites.insert(index, book);
    }

    pub fn toggle_favorite(&mut self, book: Book) -> Toggled {
        if self.remove_favorite(&book.key).is_some() {
            Toggled::Removed
        } else {
            self.favorites.push(book);
            Toggled::Added
        }
    }

    /// Move `query` to the front, dropping the oldest entries past the limit.
    ///
    /// Blank queries are ignored.
    pub fn add_recent_search(&mut self, query: &str) -> bool {
        if query.trim().is_empty() {
            return false;
        }
        if self.recent_searches.first().is_some_and(|q| q == query) {
            return false;
        }
        self.recent_searches.retain(|q| q != query);
        self.recent_searches.insert(0, query.to_string());
        self.recent_searches.truncate(Self::MAX_RECENT_SEARCHES);
        true
    }

    pub fn clear_recent_searches(&mut self) -> bool {
        let changed = !self.recent_searches.is_empty();
        self.recent_searches.clear();
        changed
    }

    /// Re-establish the invariants on state read from storage.
    fn normalize(&mut self) {
        let mut favorites: Vec<Book> = Vec::with_capacity(self.favorites.len());
        for book in self.favorites.drain(..) {
            if !favorites.iter().any(|b| b.key == book.key) {
                favorites.push(book);
            }
        }
        self.favorites = favorites;

        let mut searches: Vec<String> = Vec::with_capacity(self.recent_searches.len());
        for query in self.recent_searches.drain(..) {
            if !query.trim().is_empty() && !searches.contains(&query) {
                searches.push(query);
            }
        }
        searches.truncate(Self::MAX_RECENT_SEARCHES);
        self.recent_searches = searches;
    }
}

/// Decode a legacy document, treating anything unreadable as empty.
fn parse_legacy<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        log::warn!("Skipping unreadable legacy '{}': {}", key, e);
        T::default()
    })
}

/// Persisted store of favorites and recent searches.
///
/// Reads are synchronous. Every mutation is applied in memory first and then
/// persisted before the call returns; a persistence failure is returned but
/// the in-memory change stays.
pub struct LibraryStore {
    cell: PersistedCell<LibraryState>,
}

impl LibraryStore {
    /// Hydrate the store from storage, migrating the legacy layout if needed.
    pub async fn open(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        let (cell, hydration) =
            PersistedCell::<LibraryState>::open(storage, LIBRARY_KEY, LIBRARY_VERSION).await?;
        let store = Self { cell };

        if hydration == Hydration::Missing {
            store.migrate_legacy().await?;
        }

        let changed = store.cell.update(|state| {
            let before = state.clone();
            state.normalize();
            *state != before
        });
        if changed {
            log::warn!("Repaired duplicate entries in '{}'", LIBRARY_KEY);
            store.cell.persist().await?;
        }

        store.cell.read(|state| {
            log::debug!(
                "Library loaded: {} favorites, {} recent searches",
                state.favorites.len(),
                state.recent_searches.len()
            );
        });
        Ok(store)
    }

    /// Import favorites and searches stored under the legacy per-record keys.
    async fn migrate_legacy(&self) -> Result<()> {
        let storage = Arc::clone(self.cell.storage());
        let mut values = storage
            .multi_get(&[LEGACY_FAVORITES_KEY, LEGACY_RECENT_SEARCHES_KEY])
            .await?
            .into_iter()
            .map(|(_, value)| value);
        let (favorites_raw, searches_raw) = (values.next().flatten(), values.next().flatten());
        if favorites_raw.is_none() && searches_raw.is_none() {
            return Ok(());
        }

        let favorites: Vec<Book> = parse_legacy(LEGACY_FAVORITES_KEY, favorites_raw);
        let recent_searches: Vec<String> = parse_legacy(LEGACY_RECENT_SEARCHES_KEY, searches_raw);

        log::info!(
            "Migrating {} favorites and {} recent searches from legacy storage",
            favorites.len(),
            recent_searches.len()
        );
        self.cell.update(|state| {
            state.favorites = favorites;
            state.recent_searches = recent_searches;
            state.normalize();
        });
        self.cell.persist().await?;

        storage.remove(LEGACY_FAVORITES_KEY).await?;
        storage.remove(LEGACY_RECENT_SEARCHES_KEY).await?;
        Ok(())
    }

    pub fn favorites(&self) -> Vec<Book> {
        self.cell.read(|s| s.favorites.clone())
    }

    pub fn recent_searches(&self) -> Vec<String> {
        self.cell.read(|s| s.recent_searches.clone())
    }

    pub fn is_favorite(&self, key: &str) -> bool {
        self.cell.read(|s| s.is_favorite(key))
    }

    pub fn snapshot(&self) -> LibraryState {
        self.cell.snapshot()
    }

    /// Add a book to favorites. Returns false if it was already there.
    pub async fn add_to_favorites(&self, book: Book) -> Result<bool> {
        let added = self.cell.update(|s| s.add_favorite(book));
        if added {
            self.cell.persist().await?;
        }
        Ok(added)
    }

    /// Remove a book from favorites. Returns false if it was not there.
    pub async fn remove_from_favorites(&self, key: &str) -> Result<bool> {
        let removed = self.cell.update(|s| s.remove_favorite(key)).is_some();
        if removed {
            self.cell.persist().await?;
        }
        Ok(removed)
    }

    pub async fn toggle_favorite(&self, book: Book) -> Result<Toggled> {
        let toggled = self.cell.update(|s| s.toggle_favorite(book));
        self.cell.persist().await?;
        Ok(toggled)
    }

    pub async fn add_recent_search(&self, query: &str) -> Result<()> {
        if self.cell.update(|s| s.add_recent_search(query)) {
            self.cell.persist().await?;
        }
        Ok(())
    }

    pub async fn clear_recent_searches(&self) -> Result<()> {
        self.cell.update(LibraryState::clear_recent_searches);
        self.cell.persist().await
    }

    /// Apply a mutation chosen from the current state, in one step.
    ///
    /// The in-memory change and its compensation are returned even when
    /// persisting fails, so the caller can still undo it.
    pub(crate) async fn mutate(
        &self,
        choose: impl FnOnce(&LibraryState) -> FavoriteMutation + Send,
    ) -> (FavoriteMutation, Compensation, Result<()>) {
        let (mutation, compensation) = self.cell.update(|s| {
            let mutation = choose(s);
            let compensation = s.apply(&mutation);
            (mutation, compensation)
        });
        let persisted = if compensation == Compensation::Nothing {
            Ok(())
        } else {
            self.cell.persist().await
        };
        (mutation, compensation, persisted)
    }

    /// Undo a mutation.
    pub(crate) async fn compensate(&self, compensation: Compensation) -> Result<()> {
        if compensation == Compensation::Nothing {
            return Ok(());
        }
        self.cell.update(|s| s.compensate(compensation));
        self.cell.persist().await
    }
}
