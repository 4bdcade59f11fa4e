//! Process-wide query cache with de-duplication, staleness and invalidation.
//!
//! # Design
//! `QueryCache` is a cheap `Clone` handle over one `key -> entry` map. An
//! entry remembers the last fetched value (type-erased), whether a fetch is
//! in flight, when it last succeeded, whether it was invalidated and how many
//! enabled subscribers are mounted on it. State changes are published
//! through a `tokio::sync::watch` channel per entry, so a `Subscription`
//! always reads the live state of its key.
//!
//! The map lives behind a `std::sync::Mutex` that is only held for
//! bookkeeping and never across an `.await`. Fetches run as
//! `futures_util::future::Shared` futures: every caller that asks for a key
//! while a fetch is in flight awaits the same future and observes the same
//! settled result. A key never has more than one fetch in flight: when a
//! key is invalidated mid-fetch, the running fetch is awaited, its result
//! dropped, and the next fetch starts only after it settles.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::query::filter_query;
use crate::types::{FilterCriteria, GroceryId};

type Payload = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<Payload, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, FetchResult> + Send + Sync>;

/// Identity of a cached resource: operation plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Groceries,
    Grocery(GroceryId),
    Search(String),
    /// Holds the canonical filter query string, so equal criteria share a key.
    Filter(String),
    LowStock,
    Categories,
}

impl QueryKey {
    pub fn filter(criteria: &FilterCriteria) -> Self {
        QueryKey::Filter(filter_query(criteria))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Groceries => write!(f, "groceries"),
            QueryKey::Grocery(id) => write!(f, "grocery-{id}"),
            QueryKey::Search(name) => write!(f, "grocery-search-{name}"),
            QueryKey::Filter(query) => write!(f, "grocery-filter?{query}"),
            QueryKey::LowStock => write!(f, "low-stock-groceries"),
            QueryKey::Categories => write!(f, "grocery-categories"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Disabled queries never fetch and report "not loading, no data".
    pub enabled: bool,
    /// How long a successful result may be served without refetching.
    /// Zero refetches on every mount.
    pub stale_time: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: Duration::ZERO,
        }
    }
}

impl QueryOptions {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }
}

/// Typed view of one entry at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: T,
    /// Fetching with nothing cached yet.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
}

#[derive(Clone, Default)]
struct Snapshot {
    data: Option<Payload>,
    is_fetching: bool,
    error: Option<ApiError>,
}

struct Entry {
    fetcher: Fetcher,
    sender: watch::Sender<Snapshot>,
    stale_time: Duration,
    fetched_at: Option<Instant>,
    invalidated: bool,
    subscribers: usize,
    generation: u64,
    inflight: Option<(u64, SharedFetch)>,
    /// The in-flight fetch started before the last invalidation.
    rerun: bool,
}

/// What a waiter does once the fetch it awaited has settled.
enum Settled {
    Done,
    Rejoin,
}

impl Entry {
    fn new(fetcher: Fetcher, stale_time: Duration) -> Self {
        let (sender, _) = watch::channel(Snapshot::default());
        Self {
            fetcher,
            sender,
            stale_time,
            fetched_at: None,
            invalidated: false,
            subscribers: 0,
            generation: 0,
            inflight: None,
            rerun: false,
        }
    }

    fn needs_fetch(&self) -> bool {
        if self.invalidated {
            return true;
        }
        match self.fetched_at {
            Some(at) => at.elapsed() >= self.stale_time,
            None => true,
        }
    }
}

#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries().len())
            .finish()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mount a subscriber on `key`.
    ///
    /// Enabled subscriptions fetch when the entry has no data, was
    /// invalidated, or its staleness window elapsed; the call resolves once
    /// that fetch settles. A fetch already in flight for `key` is joined
    /// rather than repeated. The latest `fetcher` replaces the stored one.
    pub async fn subscribe<T, F, Fut>(&self, key: QueryKey, fetcher: F, options: QueryOptions) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        if !options.enabled {
            debug!(%key, "query disabled");
            return Subscription::detached(key);
        }

        let fetcher: Fetcher = Arc::new(move || fetcher().map(|r| r.map(|v| Arc::new(v) as Payload)).boxed());
        let (receiver, needs_fetch) = {
            let mut entries = self.entries();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Arc::clone(&fetcher), options.stale_time));
            entry.fetcher = fetcher;
            entry.stale_time = options.stale_time;
            entry.subscribers += 1;
            (entry.sender.subscribe(), entry.needs_fetch())
        };

        let subscription = Subscription {
            key: key.clone(),
            receiver,
            cache: Some(self.clone()),
            _marker: PhantomData,
        };
        if needs_fetch {
            self.fetch(&key).await;
        }
        subscription
    }

    /// Mark `keys` stale, then refetch those with mounted subscribers.
    ///
    /// Returns after every triggered refetch has settled. A fetch already in
    /// flight for an invalidated key is left to finish; its result is
    /// discarded and the key is fetched again.
    pub async fn invalidate<I>(&self, keys: I)
    where
        I: IntoIterator<Item = QueryKey>,
    {
        let mut active = Vec::new();
        {
            let mut entries = self.entries();
            for key in keys {
                let Some(entry) = entries.get_mut(&key) else {
                    debug!(%key, "invalidate: nothing cached");
                    continue;
                };
                entry.invalidated = true;
                entry.rerun = entry.inflight.is_some();
                if entry.subscribers > 0 {
                    active.push(key);
                }
            }
        }
        debug!(refetching = active.len(), "invalidated queries");
        join_all(active.iter().map(|key| self.fetch(key))).await;
    }

    /// Fetch `key` again regardless of staleness. No-op for unknown keys.
    pub async fn refetch(&self, key: &QueryKey) {
        self.fetch(key).await;
    }

    /// True when the next enabled read of `key` would hit the network.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries().get(key).map_or(true, Entry::needs_fetch)
    }

    pub fn is_invalidated(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_some_and(|e| e.invalidated)
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.entries().get(key).map_or(0, |e| e.subscribers)
    }

    /// Last successfully fetched value for `key`, if any.
    pub fn cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let payload = self.entries().get(key)?.sender.borrow().data.clone()?;
        payload.downcast::<T>().ok()
    }

    async fn fetch(&self, key: &QueryKey) {
        loop {
            let Some((generation, shared)) = self.start_fetch(key) else {
                return;
            };
            let result = shared.await;
            if let Settled::Done = self.settle(key, generation, result) {
                return;
            }
        }
    }

    fn start_fetch(&self, key: &QueryKey) -> Option<(u64, SharedFetch)> {
        let mut entries = self.entries();
        let entry = entries.get_mut(key)?;
        if let Some((generation, shared)) = &entry.inflight {
            debug!(%key, "joining in-flight fetch");
            return Some((*generation, shared.clone()));
        }

        entry.generation += 1;
        let shared = (entry.fetcher)().shared();
        entry.inflight = Some((entry.generation, shared.clone()));
        entry.sender.send_modify(|s| s.is_fetching = true);
        debug!(%key, generation = entry.generation, "fetch started");
        Some((entry.generation, shared))
    }

    /// Apply a settled fetch. The first waiter to arrive applies it; a
    /// fetch that was invalidated while running is dropped and every waiter
    /// rejoins the follow-up fetch.
    fn settle(&self, key: &QueryKey, generation: u64, result: FetchResult) -> Settled {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return Settled::Done;
        };
        match &entry.inflight {
            Some((current, _)) if *current == generation => {}
            Some(_) => return Settled::Rejoin,
            None => return Settled::Done,
        }
        entry.inflight = None;
        if std::mem::take(&mut entry.rerun) {
            debug!(%key, generation, "dropping result fetched before invalidation");
            return Settled::Rejoin;
        }

        match result {
            Ok(payload) => {
                debug!(%key, generation, "fetch settled");
                entry.fetched_at = Some(Instant::now());
                entry.invalidated = false;
                entry.sender.send_modify(|s| {
                    s.data = Some(payload);
                    s.error = None;
                    s.is_fetching = false;
                });
            }
            Err(error) => {
                warn!(%key, %error, "fetch failed, keeping previous data");
                entry.sender.send_modify(|s| {
                    s.error = Some(error);
                    s.is_fetching = false;
                });
            }
        }
        Settled::Done
    }

    fn unmount(&self, key: &QueryKey) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }
}

/// A mounted reader of one cache key. Dropping it unmounts.
pub struct Subscription<T> {
    key: QueryKey,
    receiver: watch::Receiver<Snapshot>,
    cache: Option<QueryCache>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
    /// A subscription that never fetches and never changes.
    fn detached(key: QueryKey) -> Self {
        let (_, receiver) = watch::channel(Snapshot::default());
        Self {
            key,
            receiver,
            cache: None,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.receiver.borrow().is_fetching
    }

    pub fn is_loading(&self) -> bool {
        let snapshot = self.receiver.borrow();
        snapshot.is_fetching && snapshot.data.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.receiver.borrow().error.is_some()
    }

    pub fn error(&self) -> Option<ApiError> {
        self.receiver.borrow().error.clone()
    }

    /// Wait for the next state change. Returns `false` if none can follow.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    pub async fn refetch(&self) {
        if let Some(cache) = &self.cache {
            cache.refetch(&self.key).await;
        }
    }
}

impl<T> Subscription<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Current data, or `T::default()` when nothing has been fetched.
    pub fn data(&self) -> T {
        let payload = self.receiver.borrow().data.clone();
        payload
            .and_then(|p| p.downcast::<T>().ok())
            .map(|data| (*data).clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> QueryState<T> {
        let (is_fetching, has_data, error) = {
            let snapshot = self.receiver.borrow();
            (snapshot.is_fetching, snapshot.data.is_some(), snapshot.error.clone())
        };
        QueryState {
            data: self.data(),
            is_loading: is_fetching && !has_data,
            is_fetching,
            is_error: error.is_some(),
            error,
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(cache) = &self.cache {
            cache.unmount(&self.key);
        }
    }
}
