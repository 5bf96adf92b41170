//! Favorite actions with optimistic updates.
//!
//! A mutation is applied to the library right away and then pushed to a
//! [`FavoritesSync`] backend. When the push fails, the mutation's
//! compensation is applied so the library returns to its previous state.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Book;
use crate::state::{Compensation, FavoriteMutation, LibraryState, LibraryStore, Toggled};

/// Remote side of the favorites collection.
#[async_trait]
pub trait FavoritesSync: Send + Sync {
    async fn push(&self, mutation: &FavoriteMutation) -> Result<()>;
}

/// Backend for a device-local collection; accepts every mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOnlySync;

#[async_trait]
impl FavoritesSync for LocalOnlySync {
    async fn push(&self, mutation: &FavoriteMutation) -> Result<()> {
        log::debug!("Favorite change for {} kept local", mutation.key());
        Ok(())
    }
}

/// Favorite add/remove/toggle with rollback on sync failure.
pub struct FavoriteActions {
    library: Arc<LibraryStore>,
    sync: Arc<dyn FavoritesSync>,
}

impl FavoriteActions {
    pub fn new(library: Arc<LibraryStore>, sync: Arc<dyn FavoritesSync>) -> Self {
        Self { library, sync }
    }

    pub fn library(&self) -> &Arc<LibraryStore> {
        &self.library
    }

    /// Add `book`. Returns false if it was already a favorite.
    pub async fn add(&self, book: Book) -> Result<bool> {
        let mutation = FavoriteMutation::Add(book);
        self.run(move |_| mutation).await
    }

    /// Remove the favorite with `key`. Returns false if there was none.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mutation = FavoriteMutation::Remove(key.to_string());
        self.run(move |_| mutation).await
    }

    pub async fn toggle(&self, book: Book) -> Result<Toggled> {
        let mut toggled = Toggled::Added;
        self.run(|state| {
            if state.is_favorite(&book.key) {
                toggled = Toggled::Removed;
                FavoriteMutation::Remove(book.key.clone())
            } else {
                FavoriteMutation::Add(book)
            }
        })
        .await?;
        Ok(toggled)
    }

    /// Apply, persist and push one mutation. Returns whether anything changed.
    async fn run(
        &self,
        choose: impl FnOnce(&LibraryState) -> FavoriteMutation + Send,
    ) -> Result<bool> {
        let (mutation, compensation, persisted) = self.library.mutate(choose).await;
        if compensation == Compensation::Nothing {
            return Ok(false);
        }
        persisted?;

        if let Err(e) = self.sync.push(&mutation).await {
            log::error!(
                "Failed to sync favorite {}: {}. Rolling back",
                mutation.key(),
                e
            );
            self.library.compensate(compensation).await?;
            return Err(AppError::Sync(e.to_string()));
        }

        log::info!("Favorite {} synced", mutation.key());
        Ok(true)
    }
}
