//! Catalog queries backed by the query cache.
//!
//! | family              | key                                        |
//! |---------------------|--------------------------------------------|
//! | search              | `books/search/{query}`                     |
//! | book details        | `books/details/{work id}`                  |
//! | trending            | `books/trending`                           |
//! | classics            | `books/classic`                            |
//! | subject             | `books/subject/{subject}`                  |
//! | author books        | `author/books-detailed/{author id}/{limit}`|
//! | author details      | `author/details/{author id}`               |
//! | all authors         | `authors/details/all/{sorted ids}`         |
//! | book with authors   | `book/with-authors/{work id}`              |

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, QueryError};
use crate::models::{AuthorDetails, Book, BookDetails, Config, SearchResponse, work_id_from_key};
use crate::query::cache::{QueryCache, QueryStatus};
use crate::query::key::QueryKey;
use crate::query::policy::{PolicyTable, QueryFamily, QueryPolicy};
use crate::services::{Catalog, CatalogResult};
use crate::utils::{grapheme_len, non_blank};

pub type QueryResult<T> = Result<QueryStatus<T>, QueryError>;

/// Authors resolved for a set of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorSet {
    pub authors: Vec<AuthorDetails>,
    /// Ids whose lookup failed
    pub missing: Vec<String>,
}

/// A work together with its authors.
///
/// Author lookups that fail are listed in `missing_authors` instead of failing
/// the whole result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookWithAuthors {
    pub book: BookDetails,
    pub authors: Vec<AuthorDetails>,
    pub missing_authors: Vec<String>,
}

impl BookWithAuthors {
    pub fn is_partial(&self) -> bool {
        !self.missing_authors.is_empty()
    }
}

/// Cached, coalesced access to the catalog.
pub struct BookQueries {
    catalog: Arc<dyn Catalog>,
    policies: PolicyTable,
    min_search_length: usize,
    search_limit: u32,
    author_works_limit: u32,
    listings: Arc<QueryCache<SearchResponse>>,
    details: Arc<QueryCache<BookDetails>>,
    author_books: Arc<QueryCache<Vec<Book>>>,
    authors: Arc<QueryCache<AuthorDetails>>,
    author_sets: Arc<QueryCache<AuthorSet>>,
    with_authors: Arc<QueryCache<BookWithAuthors>>,
}

impl BookQueries {
    pub fn new(catalog: Arc<dyn Catalog>, config: &Config) -> Self {
        Self::with_policies(catalog, config, PolicyTable::from_config(&config.queries))
    }

    pub fn with_policies(catalog: Arc<dyn Catalog>, config: &Config, policies: PolicyTable) -> Self {
        Self {
            catalog,
            policies,
            min_search_length: config.queries.min_search_length,
            search_limit: config.catalog.search_limit,
            author_works_limit: config.catalog.author_works_limit,
            listings: QueryCache::new(),
            details: QueryCache::new(),
            author_books: QueryCache::new(),
            authors: QueryCache::new(),
            author_sets: QueryCache::new(),
            with_authors: QueryCache::new(),
        }
    }

    pub fn policy(&self, family: QueryFamily) -> QueryPolicy {
        self.policies.get(family)
    }

    /// Whether `query` is long enough to be searched.
    pub fn search_enabled(&self, query: &str) -> bool {
        grapheme_len(query.trim()) > self.min_search_length
    }

    /// Free-text search. Idle until the trimmed query is long enough.
    pub async fn search_books(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<SearchResponse> {
        if !self.search_enabled(query) {
            return Ok(QueryStatus::Idle);
        }
        let query = query.trim().to_string();
        let key = QueryKey::new(["books", "search", query.as_str()]);
        let catalog = Arc::clone(&self.catalog);
        let limit = self.search_limit;

        self.listings
            .fetch(key, self.policy(QueryFamily::Search), cancel, move |token| {
                let catalog = Arc::clone(&catalog);
                let query = query.clone();
                async move { catalog.search(&query, limit, &token).await }.boxed()
            })
            .await
    }

    pub async fn book_details(
        &self,
        work_id: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<BookDetails> {
        let Some(id) = non_blank(work_id).map(work_id_from_key) else {
            return Ok(QueryStatus::Idle);
        };
        let id = id.to_string();
        let key = QueryKey::new(["books", "details", id.as_str()]);
        let catalog = Arc::clone(&self.catalog);

        self.details
            .fetch(key, self.policy(QueryFamily::BookDetails), cancel, move |token| {
                let catalog = Arc::clone(&catalog);
                let id = id.clone();
                async move { catalog.work(&id, &token).await }.boxed()
            })
            .await
    }

    pub async fn trending(&self, cancel: &CancellationToken) -> QueryResult<SearchResponse> {
        let catalog = Arc::clone(&self.catalog);
        self.listings
            .fetch(
                QueryKey::new(["books", "trending"]),
                self.policy(QueryFamily::Trending),
                cancel,
                move |token| {
                    let catalog = Arc::clone(&catalog);
                    async move { catalog.trending(&token).await }.boxed()
                },
            )
            .await
    }

    pub async fn classics(&self, cancel: &CancellationToken) -> QueryResult<SearchResponse> {
        let catalog = Arc::clone(&self.catalog);
        self.listings
            .fetch(
                QueryKey::new(["books", "classic"]),
                self.policy(QueryFamily::Classics),
                cancel,
                move |token| {
                    let catalog = Arc::clone(&catalog);
                    async move { catalog.classics(&token).await }.boxed()
                },
            )
            .await
    }

    pub async fn subject_books(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<SearchResponse> {
        let Some(subject) = non_blank(subject) else {
            return Ok(QueryStatus::Idle);
        };
        let subject = subject.to_string();
        let key = QueryKey::new(["books", "subject", subject.as_str()]);
        let catalog = Arc::clone(&self.catalog);

        self.listings
            .fetch(key, self.policy(QueryFamily::Subject), cancel, move |token| {
                let catalog = Arc::clone(&catalog);
                let subject = subject.clone();
                async move { catalog.by_subject(&subject, &token).await }.boxed()
            })
            .await
    }

    /// An author's bibliography, limited to the configured number of works.
    pub async fn author_books(
        &self,
        author_id: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Book>> {
        self.author_books_limited(author_id, self.author_works_limit, cancel)
            .await
    }

    pub async fn author_books_limited(
        &self,
        author_id: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<Book>> {
        let Some(id) = non_blank(author_id) else {
            return Ok(QueryStatus::Idle);
        };
        let id = id.to_string();
        let key = QueryKey::new([
            "author".to_string(),
            "books-detailed".to_string(),
            id.clone(),
            limit.to_string(),
        ]);
        let catalog = Arc::clone(&self.catalog);

        self.author_books
            .fetch(key, self.policy(QueryFamily::AuthorBooks), cancel, move |token| {
                let catalog = Arc::clone(&catalog);
                let id = id.clone();
                async move { catalog.author_books(&id, limit, &token).await }.boxed()
            })
            .await
    }

    pub async fn author_details(
        &self,
        author_id: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<AuthorDetails> {
        let Some(id) = non_blank(author_id) else {
            return Ok(QueryStatus::Idle);
        };
        let resolver = self.author_resolver();
        resolver.fetch(id.to_string(), cancel).await
    }

    /// Details of every listed author; failed lookups are reported as missing.
    pub async fn all_author_details(
        &self,
        author_ids: &[String],
        cancel: &CancellationToken,
    ) -> QueryResult<AuthorSet> {
        let ids = distinct_ids(author_ids);
        if ids.is_empty() {
            return Ok(QueryStatus::Idle);
        }
        let mut sorted = ids.clone();
        sorted.sort();
        let key = QueryKey::new([
            "authors".to_string(),
            "details".to_string(),
            "all".to_string(),
            sorted.join(","),
        ]);
        let resolver = self.author_resolver();

        self.author_sets
            .fetch(key, self.policy(QueryFamily::AllAuthors), cancel, move |token| {
                let resolver = resolver.clone();
                let ids = ids.clone();
                async move { resolver.fetch_all(ids, token).await }.boxed()
            })
            .await
    }

    /// A work and its authors. Authors are fetched in parallel through the
    /// author cache once the work is known.
    pub async fn book_with_authors(
        &self,
        work_id: &str,
        cancel: &CancellationToken,
    ) -> QueryResult<BookWithAuthors> {
        let Some(id) = non_blank(work_id).map(work_id_from_key) else {
            return Ok(QueryStatus::Idle);
        };
        let id = id.to_string();
        let key = QueryKey::new(["book", "with-authors", id.as_str()]);
        let catalog = Arc::clone(&self.catalog);
        let resolver = self.author_resolver();

        self.with_authors
            .fetch(key, self.policy(QueryFamily::BookWithAuthors), cancel, move |token| {
                let catalog = Arc::clone(&catalog);
                let resolver = resolver.clone();
                let id = id.clone();
                async move {
                    let book = catalog.work(&id, &token).await?;
                    let set = resolver.fetch_all(book.author_ids(), token).await?;
                    Ok::<_, CatalogError>(BookWithAuthors {
                        book,
                        authors: set.authors,
                        missing_authors: set.missing,
                    })
                }
                .boxed()
            })
            .await
    }

    /// Mark every cached value under `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let count = self.listings.invalidate_prefix(prefix)
            + self.details.invalidate_prefix(prefix)
            + self.author_books.invalidate_prefix(prefix)
            + self.authors.invalidate_prefix(prefix)
            + self.author_sets.invalidate_prefix(prefix)
            + self.with_authors.invalidate_prefix(prefix);
        log::debug!("Invalidated {} cached queries under {:?}", count, prefix);
        count
    }

    /// Mark the value under `key` stale.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        // Keys never repeat across caches
        self.listings.invalidate(key)
            || self.details.invalidate(key)
            || self.author_books.invalidate(key)
            || self.authors.invalidate(key)
            || self.author_sets.invalidate(key)
            || self.with_authors.invalidate(key)
    }

    pub fn clear(&self) {
        self.listings.clear();
        self.details.clear();
        self.author_books.clear();
        self.authors.clear();
        self.author_sets.clear();
        self.with_authors.clear();
    }

    /// Drop cached queries nobody has used within their idle window.
    pub fn prune(&self) -> usize {
        self.listings.prune()
            + self.details.prune()
            + self.author_books.prune()
            + self.authors.prune()
            + self.author_sets.prune()
            + self.with_authors.prune()
    }

    fn author_resolver(&self) -> AuthorResolver {
        AuthorResolver {
            catalog: Arc::clone(&self.catalog),
            cache: Arc::clone(&self.authors),
            policy: self.policy(QueryFamily::AuthorDetails),
        }
    }
}

/// Author lookups through the shared author cache, usable from inside other
/// fetches.
#[derive(Clone)]
struct AuthorResolver {
    catalog: Arc<dyn Catalog>,
    cache: Arc<QueryCache<AuthorDetails>>,
    policy: QueryPolicy,
}

impl AuthorResolver {
    fn fetch(
        &self,
        id: String,
        cancel: &CancellationToken,
    ) -> BoxFuture<'_, QueryResult<AuthorDetails>> {
        let key = QueryKey::new(["author", "details", id.as_str()]);
        let catalog = Arc::clone(&self.catalog);
        let cancel = cancel.clone();

        async move {
            self.cache
                .fetch(key, self.policy, &cancel, move |token| {
                    let catalog = Arc::clone(&catalog);
                    let id = id.clone();
                    async move { catalog.author(&id, &token).await }.boxed()
                })
                .await
        }
        .boxed()
    }

    async fn fetch_all(
        &self,
        ids: Vec<String>,
        cancel: CancellationToken,
    ) -> CatalogResult<AuthorSet> {
        let lookups = ids.iter().map(|id| self.fetch(id.clone(), &cancel));
        let results = future::join_all(lookups).await;

        let mut set = AuthorSet::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(QueryStatus::Success(author)) => set.authors.push((*author.data).clone()),
                Ok(QueryStatus::Cancelled) => return Err(CatalogError::Cancelled),
                Ok(QueryStatus::Idle) => set.missing.push(id),
                Err(e) => {
                    log::warn!("Author {} unavailable: {}", id, e);
                    set.missing.push(id);
                }
            }
        }
        Ok(set)
    }
}

/// Trimmed, non-empty ids with duplicates removed, in input order.
fn distinct_ids(ids: &[String]) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    for id in ids.iter().filter_map(|id| non_blank(id)) {
        if !distinct.iter().any(|seen| seen == id) {
            distinct.push(id.to_string());
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Endpoint;
    use crate::models::{AuthorRef, KeyRef};
    use crate::query::DataSource;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeCatalog {
        works: HashMap<String, BookDetails>,
        authors: HashMap<String, AuthorDetails>,
        calls: Mutex<HashMap<String, usize>>,
        delay: Duration,
    }

    impl FakeCatalog {
        fn record(&self, call: String) {
            *self.calls.lock().unwrap().entry(call).or_default() += 1;
        }

        fn calls(&self, call: &str) -> usize {
            self.calls.lock().unwrap().get(call).copied().unwrap_or(0)
        }

        fn listing(title: &str) -> SearchResponse {
            SearchResponse {
                docs: vec![Book::new(format!("/works/{title}"), title)],
                num_found: 1,
                ..SearchResponse::default()
            }
        }

        fn error(endpoint: Endpoint) -> CatalogError {
            CatalogError::Status {
                endpoint,
                status: 500,
            }
        }
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn search(
            &self,
            query: &str,
            _limit: u32,
            _cancel: &CancellationToken,
        ) -> CatalogResult<SearchResponse> {
            self.record(format!("search:{query}"));
            tokio::time::sleep(self.delay).await;
            Ok(Self::listing(query))
        }

        async fn trending(&self, _cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
            self.record("trending".into());
            Ok(Self::listing("trending"))
        }

        async fn classics(&self, _cancel: &CancellationToken) -> CatalogResult<SearchResponse> {
            self.record("classics".into());
            Ok(Self::listing("classics"))
        }

        async fn by_subject(
            &self,
            subject: &str,
            _cancel: &CancellationToken,
        ) -> CatalogResult<SearchResponse> {
            self.record(format!("subject:{subject}"));
            Ok(Self::listing(subject))
        }

        async fn work(
            &self,
            work_id: &str,
            _cancel: &CancellationToken,
        ) -> CatalogResult<BookDetails> {
            self.record(format!("work:{work_id}"));
            self.works
                .get(work_id)
                .cloned()
                .ok_or_else(|| Self::error(Endpoint::Work))
        }

        async fn author(
            &self,
            author_id: &str,
            _cancel: &CancellationToken,
        ) -> CatalogResult<AuthorDetails> {
            self.record(format!("author:{author_id}"));
            tokio::time::sleep(self.delay).await;
            self.authors
                .get(author_id)
                .cloned()
                .ok_or_else(|| Self::error(Endpoint::Author))
        }

        async fn author_books(
            &self,
            author_id: &str,
            limit: u32,
            _cancel: &CancellationToken,
        ) -> CatalogResult<Vec<Book>> {
            self.record(format!("author_books:{author_id}:{limit}"));
            Ok(vec![Book::new("/works/OL1W", "First")])
        }
    }

    fn author(id: &str) -> AuthorDetails {
        serde_json::from_value(serde_json::json!({
            "key": format!("/authors/{id}"),
            "name": format!("Author {id}"),
        }))
        .unwrap()
    }

    fn work_with_authors(id: &str, author_ids: &[&str]) -> BookDetails {
        let mut details: BookDetails = serde_json::from_value(serde_json::json!({
            "key": format!("/works/{id}"),
            "title": "Good Omens",
        }))
        .unwrap();
        details.authors = author_ids
            .iter()
            .map(|a| AuthorRef {
                author: Some(KeyRef {
                    key: Some(format!("/authors/{a}")),
                }),
                kind: None,
            })
            .collect();
        details
    }

    fn queries(catalog: Arc<FakeCatalog>) -> BookQueries {
        BookQueries::new(catalog, &Config::default())
    }

    #[tokio::test]
    async fn test_short_search_is_idle() {
        let catalog = Arc::new(FakeCatalog::default());
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        for query in ["", "ab", "  ab  ", "é\u{301}x"] {
            assert!(queries.search_books(query, &token).await.unwrap().is_idle());
        }
        let status = queries.search_books("  abc ", &token).await.unwrap();
        assert_eq!(status.data().unwrap().docs[0].title, "abc");
        assert_eq!(catalog.calls("search:abc"), 1);
    }

    #[tokio::test]
    async fn test_blank_ids_are_idle() {
        let catalog = Arc::new(FakeCatalog::default());
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        assert!(queries.book_details(" ", &token).await.unwrap().is_idle());
        assert!(queries.subject_books("", &token).await.unwrap().is_idle());
        assert!(queries.author_books("", &token).await.unwrap().is_idle());
        assert!(queries.author_details("", &token).await.unwrap().is_idle());
        assert!(queries.book_with_authors("", &token).await.unwrap().is_idle());
        assert!(
            queries
                .all_author_details(&[" ".to_string()], &token)
                .await
                .unwrap()
                .is_idle()
        );
        assert!(catalog.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_searches_coalesce() {
        let catalog = Arc::new(FakeCatalog {
            delay: Duration::from_millis(200),
            ..FakeCatalog::default()
        });
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        let (a, b, c) = tokio::join!(
            queries.search_books("dune", &token),
            queries.search_books("dune", &token),
            queries.search_books(" dune", &token),
        );
        assert_eq!(catalog.calls("search:dune"), 1);
        for status in [a, b, c] {
            assert_eq!(status.unwrap().data().unwrap().docs[0].title, "dune");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_listings_share_cache_by_key() {
        let catalog = Arc::new(FakeCatalog::default());
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        queries.trending(&token).await.unwrap();
        queries.classics(&token).await.unwrap();
        let again = queries.trending(&token).await.unwrap();
        assert_eq!(again.source(), Some(DataSource::Cache));
        assert_eq!(again.data().unwrap().docs[0].title, "trending");
        assert_eq!(catalog.calls("trending"), 1);
        assert_eq!(catalog.calls("classics"), 1);

        queries.author_books("OL1A", &token).await.unwrap();
        queries.author_books_limited("OL1A", 10, &token).await.unwrap();
        assert_eq!(catalog.calls("author_books:OL1A:50"), 1);
        assert_eq!(catalog.calls("author_books:OL1A:10"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_book_with_authors_partial_success() {
        let mut catalog = FakeCatalog::default();
        catalog.works.insert(
            "OL1W".into(),
            work_with_authors("OL1W", &["OL1A", "OL2A", "OL3A", "OL1A"]),
        );
        catalog.authors.insert("OL1A".into(), author("OL1A"));
        catalog.authors.insert("OL3A".into(), author("OL3A"));
        let catalog = Arc::new(catalog);
        let queries = queries(catalog.clone());

        let status = queries
            .book_with_authors("/works/OL1W", &CancellationToken::new())
            .await
            .unwrap();
        let result = status.data().unwrap();

        assert_eq!(result.book.book.title, "Good Omens");
        let names: Vec<&str> = result.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Author OL1A", "Author OL3A"]);
        assert_eq!(result.missing_authors, vec!["OL2A"]);
        assert!(result.is_partial());

        // The failing author is retried per the author policy, the others once
        assert_eq!(catalog.calls("author:OL1A"), 1);
        assert_eq!(catalog.calls("author:OL2A"), 4);
        assert_eq!(catalog.calls("work:OL1W"), 1);

        // Resolved authors are now in the author cache
        let cached = queries
            .author_details("OL3A", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(cached.source(), Some(DataSource::Cache));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_work_fails_after_retries() {
        let catalog = Arc::new(FakeCatalog::default());
        let mut policies = PolicyTable::default();
        policies.set(
            QueryFamily::BookWithAuthors,
            QueryPolicy {
                max_retries: 1,
                ..QueryPolicy::long_lived()
            },
        );
        let queries = BookQueries::with_policies(catalog.clone(), &Config::default(), policies);

        let error = queries
            .book_with_authors("OL404W", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(error.catalog_error(), &FakeCatalog::error(Endpoint::Work));
        assert_eq!(catalog.calls("work:OL404W"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_author_details_key_ignores_order() {
        let mut catalog = FakeCatalog::default();
        catalog.authors.insert("OL1A".into(), author("OL1A"));
        catalog.authors.insert("OL2A".into(), author("OL2A"));
        let catalog = Arc::new(catalog);
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        let first = queries
            .all_author_details(&["OL2A".into(), "OL1A".into()], &token)
            .await
            .unwrap();
        assert_eq!(first.data().unwrap().authors.len(), 2);

        let second = queries
            .all_author_details(&["OL1A".into(), "OL2A".into(), "OL1A".into()], &token)
            .await
            .unwrap();
        assert_eq!(second.source(), Some(DataSource::Cache));
        assert_eq!(catalog.calls("author:OL1A"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_prefix_spans_caches() {
        let mut catalog = FakeCatalog::default();
        catalog
            .works
            .insert("OL1W".into(), work_with_authors("OL1W", &[]));
        let catalog = Arc::new(catalog);
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();

        queries.trending(&token).await.unwrap();
        queries.book_details("OL1W", &token).await.unwrap();
        queries.book_with_authors("OL1W", &token).await.unwrap();

        assert_eq!(queries.invalidate_prefix(&["books"]), 2);
        assert!(queries.invalidate(&QueryKey::new(["book", "with-authors", "OL1W"])));
        assert!(!queries.invalidate(&QueryKey::new(["book", "with-authors", "OL2W"])));

        let refreshed = queries.book_details("OL1W", &token).await.unwrap();
        assert_eq!(refreshed.source(), Some(DataSource::Stale));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_search_reports_cancelled() {
        let catalog = Arc::new(FakeCatalog {
            delay: Duration::from_secs(5),
            ..FakeCatalog::default()
        });
        let queries = queries(catalog.clone());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let status = queries.search_books("hobbit", &token).await.unwrap();
        assert!(status.is_cancelled());
        assert_eq!(catalog.calls("search:hobbit"), 1);
    }
}
