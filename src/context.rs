//! Application context: every shared service, constructed once.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, SearchResponse};
use crate::query::{BookQueries, QueryStatus};
use crate::services::{
    Catalog, CatalogClient, ConsolePlatform, FavoriteActions, FavoritesSync, LocalOnlySync,
    NotificationPlatform, NotificationScheduler,
};
use crate::state::{LibraryStore, PreferencesStore};
use crate::storage::KeyValueStore;

/// Process-wide services sharing one storage backend.
pub struct AppContext {
    pub config: Arc<Config>,
    pub storage: Arc<dyn KeyValueStore>,
    pub library: Arc<LibraryStore>,
    pub preferences: Arc<PreferencesStore>,
    pub queries: Arc<BookQueries>,
    pub favorites: Arc<FavoriteActions>,
    pub notifications: Arc<NotificationScheduler>,
}

impl AppContext {
    /// Build the context with the HTTP catalog, the console notification
    /// platform and device-local favorites.
    pub async fn open(config: Config, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;
        let catalog = Arc::new(CatalogClient::new(&config.catalog)?);
        let platform = Arc::new(ConsolePlatform::new(
            Arc::clone(&storage),
            config.notifications.console_permission,
        ));
        Self::with_parts(config, storage, catalog, platform, Arc::new(LocalOnlySync)).await
    }

    /// Build the context from explicit collaborators.
    pub async fn with_parts(
        config: Config,
        storage: Arc<dyn KeyValueStore>,
        catalog: Arc<dyn Catalog>,
        platform: Arc<dyn NotificationPlatform>,
        sync: Arc<dyn FavoritesSync>,
    ) -> Result<Self> {
        let library = Arc::new(LibraryStore::open(Arc::clone(&storage)).await?);
        let preferences = Arc::new(PreferencesStore::open(Arc::clone(&storage)).await?);
        let queries = Arc::new(BookQueries::new(catalog, &config));
        let favorites = Arc::new(FavoriteActions::new(Arc::clone(&library), sync));
        let notifications = Arc::new(NotificationScheduler::new(
            platform,
            Arc::clone(&storage),
            Arc::clone(&preferences),
        ));

        log::info!(
            "Context ready: {} favorites, {} recent searches",
            library.favorites().len(),
            library.recent_searches().len()
        );

        Ok(Self {
            config: Arc::new(config),
            storage,
            library,
            preferences,
            queries,
            favorites,
            notifications,
        })
    }

    /// Search and, when the query is long enough to run, remember it.
    ///
    /// Failing to persist the recent search does not fail the search.
    pub async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryStatus<SearchResponse>> {
        if self.queries.search_enabled(query) {
            if let Err(e) = self.library.add_recent_search(query.trim()).await {
                log::warn!("Recent search '{}' kept in memory only: {}", query.trim(), e);
            }
        }
        Ok(self.queries.search_books(query, cancel).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, CatalogError};
    use crate::state::LIBRARY_KEY;
    use crate::models::{AuthorDetails, Book, BookDetails};
    use crate::services::CatalogResult;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    /// Catalog that only answers searches.
    struct SearchOnly;

    #[async_trait]
    impl Catalog for SearchOnly {
        async fn search(
            &self,
            query: &str,
            _limit: u32,
            _cancel: &CancellationToken,
        ) -> CatalogResult<SearchResponse> {
            Ok(SearchResponse {
                docs: vec![Book::new("/works/OL1W", query)],
                num_found: 1,
                ..SearchResponse::default()
            })
        }

        async fn trending(&self, _cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }

        async fn classics(&self, _cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }

        async fn by_subject(
            &self,
            _subject: &str,
            _cancel: &CancellationToken,
        ) -> CatalogResult<SearchResponse> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }

        async fn work(&self, _id: &str, _cancel: &CancellationToken) -> CatalogResult<BookDetails> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }

        async fn author(
            &self,
            _id: &str,
            _cancel: &CancellationToken,
        ) -> CatalogResult<AuthorDetails> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }

        async fn author_books(
            &self,
            _id: &str,
            _limit: u32,
            _cancel: &CancellationToken,
        ) -> CatalogResult<Vec<Book>> {
            Err(CatalogError::InvalidRequest("unsupported".into()))
        }
    }

    /// Memory storage that refuses writes to one key.
    struct RejectingKey {
        inner: MemoryStorage,
        key: &'static str,
    }

    #[async_trait]
    impl KeyValueStore for RejectingKey {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.key {
                return Err(AppError::storage(key, "disk full"));
            }
            self.inner.set(key, value).await
        }
        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
        async fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    async fn context() -> AppContext {
        context_with(Arc::new(MemoryStorage::new())).await
    }

    async fn context_with(storage: Arc<dyn KeyValueStore>) -> AppContext {
        let platform = Arc::new(ConsolePlatform::new(Arc::clone(&storage), true));
        AppContext::with_parts(
            Config::default(),
            storage,
            Arc::new(SearchOnly),
            platform,
            Arc::new(LocalOnlySync),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_records_recent_queries() {
        let ctx = context().await;
        let token = CancellationToken::new();

        ctx.search("dune", &token).await.unwrap();
        ctx.search("  hobbit ", &token).await.unwrap();
        let idle = ctx.search("ab", &token).await.unwrap();

        assert!(idle.is_idle());
        assert_eq!(ctx.library.recent_searches(), vec!["hobbit", "dune"]);
    }

    #[tokio::test]
    async fn test_search_survives_unsaved_recent_search() {
        let storage = RejectingKey {
            inner: MemoryStorage::new(),
            key: LIBRARY_KEY,
        };
        let ctx = context_with(Arc::new(storage)).await;

        let status = ctx.search("dune", &CancellationToken::new()).await.unwrap();
        assert_eq!(status.data().map(|r| r.num_found), Some(1));
        assert_eq!(ctx.library.recent_searches(), vec!["dune"]);
    }

    #[tokio::test]
    async fn test_services_share_storage() {
        let ctx = context().await;
        ctx.favorites
            .add(Book::new("/works/OL1W", "Dune"))
            .await
            .unwrap();
        ctx.notifications.schedule_recurring(60).await.unwrap();

        let reopened = LibraryStore::open(Arc::clone(&ctx.storage)).await.unwrap();
        assert!(reopened.is_favorite("/works/OL1W"));
        assert!(ctx.preferences.daily_reminder().enabled);
        assert_eq!(ctx.notifications.scheduled().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let mut config = Config::default();
        config.catalog.base_url = "not a url".into();
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
        assert!(AppContext::open(config, storage).await.is_err());
    }
}
