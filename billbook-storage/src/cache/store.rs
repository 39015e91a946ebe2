//! In-memory TTL cache with single-flight loading.
//!
//! Every key is in one of three states: absent, loading (a shared load
//! future is registered in the in-flight table), or cached (an entry whose
//! freshness is measured from its timestamp). Concurrent callers for a key
//! that is loading attach to the same shared future, so the loader runs at
//! most once per key at a time. Different keys load independently. Each
//! load runs on a spawned task, so dropping a caller never stalls it.
//!
//! The state mutex is never held across an await.

use std::any::type_name;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use billbook_core::{BillbookError, BillbookResult, CacheError};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Notify;

use super::clock::{Clock, SystemClock};
use super::config::CacheConfig;
use super::entry::{CacheEntry, SharedValue};
use super::traits::{CacheStats, CacheValue};

type LoadOutcome = Result<SharedValue, BillbookError>;
type SharedLoad = Shared<BoxFuture<'static, LoadOutcome>>;

struct InFlight {
    load_id: u64,
    load: SharedLoad,
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    /// Keys marked loading by hand through `set_loading`.
    loading_markers: HashSet<String>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct StoreInner {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    marker_cleared: Notify,
    next_load_id: AtomicU64,
    counters: Counters,
}

/// What a caller of `fetch_or_load` should do next.
enum Plan<T, F> {
    Hit(T),
    Join(SharedLoad),
    /// A manual loading marker is set; wait and retry with the loader.
    Wait(F),
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // Every mutation leaves the maps consistent, so a poisoned lock is
        // still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn has_marker(&self, key: &str) -> bool {
        self.lock().loading_markers.contains(key)
    }

    /// Fresh value for `key`, evicting the entry if it has expired.
    fn lookup<T: CacheValue>(&self, state: &mut StoreState, key: &str) -> Option<T> {
        let now = self.clock.now();
        let fresh = state.entries.get(key).map(|entry| entry.is_fresh(now))?;
        if !fresh {
            state.entries.remove(key);
            bump(&self.counters.evictions);
            tracing::debug!(key, "evicted expired cache entry");
            return None;
        }

        let value = state.entries.get(key).and_then(CacheEntry::value::<T>);
        if value.is_none() {
            tracing::warn!(
                key,
                expected = type_name::<T>(),
                "cached value has a different type; treating as miss"
            );
        }
        value
    }

    fn plan<T, F, Fut>(self: &Arc<Self>, key: &str, loader: F, expiry: Duration) -> Plan<T, F>
    where
        T: CacheValue,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = BillbookResult<T>> + Send + 'static,
    {
        let mut state = self.lock();

        if let Some(flight) = state.in_flight.get(key) {
            bump(&self.counters.coalesced);
            tracing::debug!(key, load_id = flight.load_id, "joining in-flight load");
            return Plan::Join(flight.load.clone());
        }
        if state.loading_markers.contains(key) {
            return Plan::Wait(loader);
        }
        if let Some(value) = self.lookup::<T>(&mut state, key) {
            bump(&self.counters.hits);
            return Plan::Hit(value);
        }

        bump(&self.counters.misses);
        let load_id = self.next_load_id.fetch_add(1, Ordering::Relaxed);
        let load = Self::load_future(Arc::clone(self), key.to_string(), load_id, loader, expiry);
        state.in_flight.insert(
            key.to_string(),
            InFlight {
                load_id,
                load: load.clone(),
            },
        );
        tracing::debug!(key, load_id, ttl_ms = expiry.as_millis() as u64, "starting load");
        Plan::Join(load)
    }

    /// Spawn a loader, wrapped in the timeout and the bookkeeping that
    /// stores its result, and return a shared handle to its outcome.
    ///
    /// The load runs on its own task, so it completes and clears its
    /// in-flight slot even if every caller awaiting it is dropped. Must be
    /// called from within a tokio runtime.
    fn load_future<T, F, Fut>(
        inner: Arc<Self>,
        key: String,
        load_id: u64,
        loader: F,
        expiry: Duration,
    ) -> SharedLoad
    where
        T: CacheValue,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = BillbookResult<T>> + Send + 'static,
    {
        let task_key = key.clone();
        let task = async move {
            let key = task_key;
            let timeout = inner.config.loader_timeout;
            let guarded = AssertUnwindSafe(async move { loader().await }).catch_unwind();
            let outcome: LoadOutcome = match tokio::time::timeout(timeout, guarded).await {
                Ok(Ok(Ok(value))) => Ok(Arc::new(value) as SharedValue),
                Ok(Ok(Err(error))) => Err(error),
                Ok(Err(_)) => Err(CacheError::LoaderAborted {
                    key: key.clone(),
                    reason: "loader panicked".to_string(),
                }
                .into()),
                Err(_) => Err(CacheError::LoaderTimeout {
                    key: key.clone(),
                    timeout,
                }
                .into()),
            };
            inner.finish_load(&key, load_id, expiry, &outcome);
            outcome
        };
        let handle = tokio::spawn(task);

        async move {
            handle.await.unwrap_or_else(|error| {
                Err(CacheError::LoaderAborted {
                    key,
                    reason: error.to_string(),
                }
                .into())
            })
        }
        .boxed()
        .shared()
    }

    /// Clear the in-flight slot and store a successful result, unless the
    /// load was detached by `set`, `invalidate` or `clear` in the meantime.
    fn finish_load(&self, key: &str, load_id: u64, expiry: Duration, outcome: &LoadOutcome) {
        let mut state = self.lock();
        let current = state
            .in_flight
            .get(key)
            .is_some_and(|flight| flight.load_id == load_id);
        if current {
            state.in_flight.remove(key);
        }

        match outcome {
            Ok(value) => {
                bump(&self.counters.loads);
                if current {
                    let entry = CacheEntry::new(Arc::clone(value), self.clock.now(), expiry);
                    state.entries.insert(key.to_string(), entry);
                    tracing::debug!(key, load_id, "cache populated");
                } else {
                    tracing::debug!(key, load_id, "load detached before completion; result not stored");
                }
            }
            Err(error) => {
                bump(&self.counters.load_failures);
                tracing::warn!(key, load_id, %error, "cache loader failed");
            }
        }
    }
}

/// Read-through cache with request coalescing.
///
/// Cloning is cheap and every clone shares the same entries. Construct one
/// per session in the composition root and pass it to callers.
///
/// # Example
///
/// ```ignore
/// let cache = CacheStore::new(CacheConfig::default());
///
/// // Concurrent callers for "items:b1" share one remote read.
/// let items: Vec<Item> = cache
///     .fetch_or_load("items:b1", move || async move { remote.items(b1).await }, ttl)
///     .await;
/// ```
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

impl CacheStore {
    /// Create a cache using the wall clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState::default()),
                clock,
                config,
                marker_cleared: Notify::new(),
                next_load_id: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Return the value for `key` if it is fresh and of type `T`.
    ///
    /// An expired entry is evicted and reported as absent.
    pub fn get<T: CacheValue>(&self, key: impl AsRef<str>) -> Option<T> {
        let key = key.as_ref();
        let mut state = self.inner.lock();
        let value = self.inner.lookup::<T>(&mut state, key);
        match value {
            Some(_) => bump(&self.inner.counters.hits),
            None => bump(&self.inner.counters.misses),
        }
        value
    }

    /// Store `value` under `key` with a fresh timestamp.
    ///
    /// Clears the loading state of the key: a manual marker is removed and
    /// an in-flight load is detached so it cannot overwrite this value.
    pub fn set<T: CacheValue>(&self, key: impl AsRef<str>, value: T, expiry: Duration) {
        let key = key.as_ref();
        {
            let mut state = self.inner.lock();
            let entry = CacheEntry::new(Arc::new(value), self.inner.clock.now(), expiry);
            state.entries.insert(key.to_string(), entry);
            state.in_flight.remove(key);
            state.loading_markers.remove(key);
        }
        self.inner.marker_cleared.notify_waiters();
    }

    /// True while a load for `key` is in flight or a manual marker is set.
    pub fn is_loading(&self, key: impl AsRef<str>) -> bool {
        let key = key.as_ref();
        let state = self.inner.lock();
        state.in_flight.contains_key(key) || state.loading_markers.contains(key)
    }

    /// Set or clear a manual loading marker.
    ///
    /// While the marker is set, `fetch_or_load` callers wait (up to the
    /// loader timeout) instead of starting their own load. Clearing the
    /// marker wakes them.
    pub fn set_loading(&self, key: impl AsRef<str>, loading: bool) {
        let key = key.as_ref();
        if loading {
            self.inner.lock().loading_markers.insert(key.to_string());
        } else {
            let removed = self.inner.lock().loading_markers.remove(key);
            if removed {
                self.inner.marker_cleared.notify_waiters();
            }
        }
    }

    /// Return the cached value or load it, coalescing concurrent loads.
    ///
    /// Failures (loader error, loader timeout, stuck marker) are logged and
    /// converted to `T::default()`; callers cannot tell "no data" from
    /// "fetch failed". Use [`CacheStore::try_fetch_or_load`] to see the error.
    /// A failure is never cached, so the next call retries.
    pub async fn fetch_or_load<T, F, Fut>(
        &self,
        key: impl AsRef<str>,
        loader: F,
        expiry: Duration,
    ) -> T
    where
        T: CacheValue,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = BillbookResult<T>> + Send + 'static,
    {
        let key = key.as_ref();
        match self.try_fetch_or_load(key, loader, expiry).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "cache read failed; returning empty value");
                T::default()
            }
        }
    }

    /// Like [`CacheStore::fetch_or_load`], but surfaces failures.
    ///
    /// Every caller that joined a failed load receives the same error.
    pub async fn try_fetch_or_load<T, F, Fut>(
        &self,
        key: impl AsRef<str>,
        loader: F,
        expiry: Duration,
    ) -> BillbookResult<T>
    where
        T: CacheValue,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = BillbookResult<T>> + Send + 'static,
    {
        let key = key.as_ref();
        let mut loader = loader;
        loop {
            match self.inner.plan::<T, F, Fut>(key, loader, expiry) {
                Plan::Hit(value) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                Plan::Join(load) => {
                    let value = load.await?;
                    return value.downcast_ref::<T>().cloned().ok_or_else(|| {
                        CacheError::TypeMismatch {
                            key: key.to_string(),
                            expected: type_name::<T>(),
                        }
                        .into()
                    });
                }
                Plan::Wait(returned) => {
                    loader = returned;
                    self.wait_for_marker(key).await?;
                }
            }
        }
    }

    async fn wait_for_marker(&self, key: &str) -> BillbookResult<()> {
        let timeout = self.inner.config.loader_timeout;
        let wait = async {
            loop {
                let mut notified = std::pin::pin!(self.inner.marker_cleared.notified());
                // Register before checking so a clear between the check and
                // the await is not missed.
                notified.as_mut().enable();
                if !self.inner.has_marker(key) {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            tracing::warn!(key, waited_ms = timeout.as_millis() as u64, "loading marker never cleared");
            CacheError::LoadingMarkerStuck {
                key: key.to_string(),
                waited: timeout,
            }
            .into()
        })
    }

    /// Remove the named entries. In-flight loads for those keys are detached
    /// so their results are not stored. Returns how many entries were removed.
    pub fn invalidate<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut state = self.inner.lock();
        let mut removed = 0;
        for key in keys {
            let key = key.as_ref();
            if state.entries.remove(key).is_some() {
                removed += 1;
            }
            state.in_flight.remove(key);
        }
        tracing::debug!(removed, "invalidated cache keys");
        removed
    }

    /// Remove every entry whose key starts with `prefix`, detaching matching
    /// in-flight loads. Returns how many entries were removed.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut state = self.inner.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(prefix));
        state.in_flight.retain(|key, _| !key.starts_with(prefix));
        let removed = before - state.entries.len();
        tracing::debug!(prefix, removed, "invalidated cache prefix");
        removed
    }

    /// Drop every entry, in-flight load and loading marker.
    pub fn clear(&self) {
        {
            let mut state = self.inner.lock();
            *state = StoreState::default();
        }
        self.inner.marker_cleared.notify_waiters();
        tracing::info!("cache cleared");
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            loads: counters.loads.load(Ordering::Relaxed),
            load_failures: counters.load_failures.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.inner.config)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
