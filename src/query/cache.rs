//! Keyed query cache with request coalescing.
//!
//! Every key has at most one fetch in flight. Callers asking for the same key
//! while it runs share its result. A fetch is aborted once its last caller has
//! cancelled, unless it is a background refresh of a stale value.
//!
//! Entries not accessed within their policy's `gc_time` are dropped on the
//! next fetch, unless a fetch for them is still running.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CatalogError, QueryError};
use crate::query::key::QueryKey;
use crate::query::policy::QueryPolicy;

/// Where a successful result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fetched by this call or by a fetch it joined
    Network,
    /// Fresh cached value
    Cache,
    /// Stale cached value; a refresh was started in the background
    Stale,
}

/// A successful query result.
#[derive(Debug)]
pub struct QueryData<T> {
    pub data: Arc<T>,
    pub updated_at: DateTime<Utc>,
    pub source: DataSource,
}

impl<T> Clone for QueryData<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            updated_at: self.updated_at,
            source: self.source,
        }
    }
}

/// Non-error outcome of a query.
#[derive(Debug)]
pub enum QueryStatus<T> {
    /// The query's enabling predicate was false; nothing was fetched
    Idle,
    /// The caller cancelled before a result arrived
    Cancelled,
    Success(QueryData<T>),
}

impl<T> QueryStatus<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryStatus::Success(result) => Some(&result.data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<Arc<T>> {
        match self {
            QueryStatus::Success(result) => Some(result.data),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<DataSource> {
        match self {
            QueryStatus::Success(result) => Some(result.source),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, QueryStatus::Idle)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryStatus::Cancelled)
    }
}

/// Result shared by every caller of one fetch.
enum Outcome<T> {
    Done(Result<QueryData<T>, QueryError>),
    Aborted,
}

impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Done(result) => Outcome::Done(result.clone()),
            Outcome::Aborted => Outcome::Aborted,
        }
    }
}

struct Cached<T> {
    data: Arc<T>,
    updated_at: DateTime<Utc>,
    fetched_at: Instant,
    invalidated: bool,
}

struct InFlight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, Outcome<T>>>,
    abort: CancellationToken,
    waiters: usize,
    /// Background refreshes outlive their callers
    detached: bool,
}

struct Entry<T> {
    cached: Option<Cached<T>>,
    last_error: Option<QueryError>,
    in_flight: Option<InFlight<T>>,
    last_used: Instant,
    gc_time: Duration,
}

impl<T> Entry<T> {
    fn new(gc_time: Duration) -> Self {
        Self {
            cached: None,
            last_error: None,
            in_flight: None,
            last_used: Instant::now(),
            gc_time,
        }
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.in_flight.is_none() && now.saturating_duration_since(self.last_used) >= self.gc_time
    }
}

/// Cache of query results of one value type.
pub struct QueryCache<T> {
    entries: Mutex<HashMap<QueryKey, Entry<T>>>,
    next_id: AtomicU64,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve `key` from the cache or through `fetcher`.
    ///
    /// - A fresh cached value is returned without calling `fetcher`.
    /// - A stale cached value is returned immediately and refreshed in the
    ///   background.
    /// - Otherwise the call joins the fetch in flight for `key`, or starts one.
    ///
    /// Failed attempts are retried per `policy`. Cancelling `cancel` returns
    /// [`QueryStatus::Cancelled`]; the shared fetch stops only when no other
    /// caller is waiting on it.
    pub async fn fetch<F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        policy: QueryPolicy,
        cancel: &CancellationToken,
        fetcher: F,
    ) -> Result<QueryStatus<T>, QueryError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Ok(QueryStatus::Cancelled);
        }

        let (id, future) = {
            let mut entries = self.lock();
            prune_idle(&mut entries);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(policy.gc_time));
            entry.last_used = Instant::now();
            entry.gc_time = policy.gc_time;

            let cached = entry.cached.as_ref().map(|cached| {
                let fresh =
                    !cached.invalidated && cached.fetched_at.elapsed() < policy.stale_time;
                let data = QueryData {
                    data: Arc::clone(&cached.data),
                    updated_at: cached.updated_at,
                    source: DataSource::Cache,
                };
                (data, fresh)
            });

            if let Some((data, fresh)) = cached {
                if fresh {
                    return Ok(QueryStatus::Success(data));
                }
                if entry.in_flight.is_none() {
                    log::debug!("Refreshing stale query {}", key);
                    let flight = self.start(&key, policy, fetcher, true);
                    let refresh = flight.future.clone();
                    entry.in_flight = Some(flight);
                    tokio::spawn(async move {
                        refresh.await;
                    });
                }
                return Ok(QueryStatus::Success(QueryData {
                    source: DataSource::Stale,
                    ..data
                }));
            }

            let flight = entry
                .in_flight
                .get_or_insert_with(|| self.start(&key, policy, fetcher, false));
            flight.waiters += 1;
            (flight.id, flight.future.clone())
        };

        let _waiter = Waiter {
            cache: &**self,
            key: &key,
            id,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(QueryStatus::Cancelled),
            outcome = future => outcome,
        };

        match outcome {
            Outcome::Done(result) => result.map(QueryStatus::Success),
            Outcome::Aborted => Ok(QueryStatus::Cancelled),
        }
    }

    fn start<F, Fut>(
        self: &Arc<Self>,
        key: &QueryKey,
        policy: QueryPolicy,
        fetcher: F,
        detached: bool,
    ) -> InFlight<T>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let abort = CancellationToken::new();
        let cache = Arc::downgrade(self);
        let key = key.clone();
        let token = abort.clone();

        let future = async move {
            let outcome = run_attempts(&key, policy, &token, fetcher).await;
            if let Some(cache) = cache.upgrade() {
                cache.complete(&key, id, &outcome);
            }
            outcome
        }
        .boxed()
        .shared();

        InFlight {
            id,
            future,
            abort,
            waiters: 0,
            detached,
        }
    }

    fn complete(&self, key: &QueryKey, id: u64, outcome: &Outcome<T>) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if !entry.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
            return;
        }
        entry.in_flight = None;

        match outcome {
            Outcome::Done(Ok(result)) => {
                let now = Instant::now();
                entry.cached = Some(Cached {
                    data: Arc::clone(&result.data),
                    updated_at: result.updated_at,
                    fetched_at: now,
                    invalidated: false,
                });
                entry.last_used = now;
                entry.last_error = None;
            }
            Outcome::Done(Err(e)) => entry.last_error = Some(e.clone()),
            Outcome::Aborted => {}
        }
    }

    fn leave(&self, key: &QueryKey, id: u64) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        let Some(flight) = entry.in_flight.as_mut().filter(|flight| flight.id == id) else {
            return;
        };

        flight.waiters = flight.waiters.saturating_sub(1);
        if flight.waiters == 0 && !flight.detached {
            flight.abort.cancel();
            entry.in_flight = None;
            log::debug!("Aborted query {}: no callers left", key);
        }
    }

    /// Cached value for `key` regardless of age.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryData<T>> {
        let entries = self.lock();
        let cached = entries.get(key)?.cached.as_ref()?;
        Some(QueryData {
            data: Arc::clone(&cached.data),
            updated_at: cached.updated_at,
            source: DataSource::Cache,
        })
    }

    /// Error of the last failed fetch for `key`, cleared by the next success.
    pub fn last_error(&self, key: &QueryKey) -> Option<QueryError> {
        self.lock().get(key)?.last_error.clone()
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    /// Mark the value for `key` stale so the next access refreshes it.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        match self.lock().get_mut(key).and_then(|entry| entry.cached.as_mut()) {
            Some(cached) => {
                cached.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Mark every value whose key starts with `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if let Some(cached) = entry.cached.as_mut().filter(|_| key.starts_with(prefix)) {
                cached.invalidated = true;
                count += 1;
            }
        }
        count
    }

    /// Drop entries unused for longer than their `gc_time`. Returns how many
    /// were dropped.
    pub fn prune(&self) -> usize {
        prune_idle(&mut self.lock())
    }

    /// Drop every cached value. Fetches in flight are left running.
    pub fn clear(&self) {
        self.lock().retain(|_, entry| {
            entry.cached = None;
            entry.last_error = None;
            entry.in_flight.is_some()
        });
    }

    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| entry.cached.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_idle<T>(entries: &mut HashMap<QueryKey, Entry<T>>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_idle(now));
    let pruned = before - entries.len();
    if pruned > 0 {
        log::debug!("Dropped {} idle cached queries", pruned);
    }
    pruned
}

/// Releases a caller's claim on a fetch, including when the caller is dropped.
struct Waiter<'a, T>
where
    T: Send + Sync + 'static,
{
    cache: &'a QueryCache<T>,
    key: &'a QueryKey,
    id: u64,
}

impl<T> Drop for Waiter<'_, T>
where
    T: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cache.leave(self.key, self.id);
    }
}

async fn run_attempts<T, F, Fut>(
    key: &QueryKey,
    policy: QueryPolicy,
    abort: &CancellationToken,
    fetcher: F,
) -> Outcome<T>
where
    F: Fn(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = tokio::select! {
            biased;
            _ = abort.cancelled() => return Outcome::Aborted,
            result = fetcher(abort.clone()) => result,
        };

        let error = match result {
            Ok(data) => {
                return Outcome::Done(Ok(QueryData {
                    data: Arc::new(data),
                    updated_at: Utc::now(),
                    source: DataSource::Network,
                }));
            }
            Err(CatalogError::Cancelled) => return Outcome::Aborted,
            Err(e) => e,
        };

        if !error.is_retryable() || attempt >= policy.max_retries {
            log::warn!(
                "Query {} failed after {} attempt(s): {}",
                key,
                attempt + 1,
                error
            );
            return Outcome::Done(Err(QueryError::Exhausted {
                key: key.to_string(),
                attempts: attempt + 1,
                source: error,
            }));
        }

        let delay = policy.backoff.delay(attempt);
        log::debug!(
            "Query {} attempt {} failed ({}), retrying in {:?}",
            key,
            attempt + 1,
            error,
            delay
        );
        attempt += 1;

        tokio::select! {
            biased;
            _ = abort.cancelled() => return Outcome::Aborted,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Endpoint;
    use std::sync::atomic::AtomicUsize;

    type Fetch<T> = BoxFuture<'static, Result<T, CatalogError>>;

    fn key(name: &str) -> QueryKey {
        QueryKey::new(["books", "search", name])
    }

    fn policy(max_retries: u32) -> QueryPolicy {
        QueryPolicy {
            max_retries,
            ..QueryPolicy::short_lived()
        }
    }

    fn server_error() -> CatalogError {
        CatalogError::Status {
            endpoint: Endpoint::Search,
            status: 503,
        }
    }

    /// Fetcher that counts calls and answers `value` after `delay`.
    fn counting(
        calls: Arc<AtomicUsize>,
        delay: Duration,
        value: u32,
    ) -> impl Fn(CancellationToken) -> Fetch<u32> + Send + Sync + 'static {
        move |_token| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(delay).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let (a, b) = tokio::join!(
            cache.fetch(
                key("dune"),
                policy(2),
                &token,
                counting(calls.clone(), Duration::from_millis(100), 7)
            ),
            cache.fetch(
                key("dune"),
                policy(2),
                &token,
                counting(calls.clone(), Duration::from_millis(100), 8)
            ),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().data(), Some(&7));
        assert_eq!(b.unwrap().data(), Some(&7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_served_from_cache() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let first = cache
            .fetch(key("dune"), policy(2), &token, counting(calls.clone(), Duration::ZERO, 1))
            .await
            .unwrap();
        assert_eq!(first.source(), Some(DataSource::Network));

        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache
            .fetch(key("dune"), policy(2), &token, counting(calls.clone(), Duration::ZERO, 2))
            .await
            .unwrap();
        assert_eq!(second.source(), Some(DataSource::Cache));
        assert_eq!(second.data(), Some(&1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_returned_then_refreshed() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        cache
            .fetch(key("dune"), policy(2), &token, counting(calls.clone(), Duration::ZERO, 1))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        let stale = cache
            .fetch(
                key("dune"),
                policy(2),
                &token,
                counting(calls.clone(), Duration::from_millis(50), 2),
            )
            .await
            .unwrap();
        assert_eq!(stale.source(), Some(DataSource::Stale));
        assert_eq!(stale.data(), Some(&1));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek(&key("dune")).map(|d| *d.data), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff_then_fails() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let counter = calls.clone();
        let started = Instant::now();

        let result = cache
            .fetch(key("dune"), policy(2), &token, move |_token| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(server_error()) }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            error,
            QueryError::Exhausted {
                key: "books/search/dune".into(),
                attempts: 3,
                source: server_error(),
            }
        );
        // 1s + 2s of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
        assert_eq!(cache.last_error(&key("dune")), Some(error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_not_retried() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = cache
            .fetch(key("x"), policy(3), &CancellationToken::new(), move |_token| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(CatalogError::InvalidRequest("bad id".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_fetch_without_retry() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::<CancellationToken>::new()));
        let token = CancellationToken::new();

        let counter = calls.clone();
        let tokens = seen.clone();
        let fetcher = move |abort: CancellationToken| {
            counter.fetch_add(1, Ordering::SeqCst);
            tokens.lock().unwrap().push(abort);
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Err::<u32, _>(server_error())
            }
        };

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let status = cache.fetch(key("dune"), policy(3), &token, fetcher).await.unwrap();
        assert!(status.is_cancelled());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.lock().unwrap()[0].is_cancelled());
        assert!(!cache.is_fetching(&key("dune")));
        assert!(cache.peek(&key("dune")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_caller_keeps_shared_fetch() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let leaving = CancellationToken::new();
        let staying = CancellationToken::new();

        let canceller = leaving.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let (left, stayed) = tokio::join!(
            cache.fetch(
                key("dune"),
                policy(0),
                &leaving,
                counting(calls.clone(), Duration::from_millis(100), 5)
            ),
            cache.fetch(
                key("dune"),
                policy(0),
                &staying,
                counting(calls.clone(), Duration::from_millis(100), 6)
            ),
        );

        assert!(left.unwrap().is_cancelled());
        assert_eq!(stayed.unwrap().data(), Some(&5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        token.cancel();

        let status = cache
            .fetch(key("dune"), policy(0), &token, counting(calls.clone(), Duration::ZERO, 1))
            .await
            .unwrap();
        assert!(status.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_prefix_forces_refresh() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        for name in ["dune", "emma"] {
            cache
                .fetch(key(name), policy(0), &token, counting(calls.clone(), Duration::ZERO, 1))
                .await
                .unwrap();
        }
        assert_eq!(cache.invalidate_prefix(&["books", "search"]), 2);
        assert_eq!(cache.invalidate_prefix(&["authors"]), 0);

        let status = cache
            .fetch(key("dune"), policy(0), &token, counting(calls.clone(), Duration::ZERO, 2))
            .await
            .unwrap();
        assert_eq!(status.source(), Some(DataSource::Stale));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_entries_are_dropped() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        for n in 0..50 {
            cache
                .fetch(
                    key(&format!("query {n}")),
                    policy(0),
                    &token,
                    counting(calls.clone(), Duration::ZERO, n),
                )
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 50);

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        cache
            .fetch(key("recent"), policy(0), &token, counting(calls.clone(), Duration::ZERO, 1))
            .await
            .unwrap();
        assert_eq!(cache.len(), 51);

        // gc_time of the short-lived policy is 10 minutes
        tokio::time::advance(Duration::from_secs(5 * 60)).await;
        assert_eq!(cache.prune(), 50);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key("recent")).is_some());

        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        cache
            .fetch(key("dune"), policy(0), &token, counting(calls.clone(), Duration::ZERO, 2))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key("recent")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_fetch_survives_pruning() {
        let cache = QueryCache::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let gc = QueryPolicy {
            gc_time: Duration::from_secs(1),
            ..policy(0)
        };

        let slow = cache.fetch(
            key("slow"),
            gc,
            &token,
            counting(calls.clone(), Duration::from_secs(30), 9),
        );
        let pruner = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            cache.prune()
        };
        let (status, pruned) = tokio::join!(slow, pruner);

        assert_eq!(pruned, 0);
        assert_eq!(status.unwrap().data(), Some(&9));
        assert!(cache.peek(&key("slow")).is_some());
    }
}
