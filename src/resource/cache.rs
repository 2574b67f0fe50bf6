// src/resource/cache.rs
//! Per-key lifecycle cache with fetch deduplication.
//!
//! One record per key, created on first access. `get` on an `Idle` record
//! starts a fetch; every other caller attaches to the same in-flight handle
//! until the fetch settles. Listeners run outside the state lock, in
//! subscription order, once per transition.
//!
//! Transitions are queued per key and delivered by a single drainer at a
//! time. A listener that re-enters the cache (e.g. `invalidate` on `Error`)
//! only queues its transition; it is delivered after the current one has
//! reached every listener.
//!
//! There is no timeout: a source that never resolves leaves the record in
//! `Loading` for the lifetime of the cache.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::inflight::{self, FetchOutcome, Fulfiller};
use super::{DataSource, FetchFailure, ResourceKey, ResourceRecord, ResourceState};

/// Callback invoked with the record after each transition.
pub type Listener<T> = Arc<dyn Fn(&ResourceRecord<T>) + Send + Sync>;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "resource_fetch_started_total",
            "Fetch cycles started, by resource key."
        );
        describe_counter!(
            "resource_fetch_joined_total",
            "Reads that attached to an already in-flight fetch."
        );
        describe_counter!(
            "resource_fetch_failed_total",
            "Fetch cycles that settled in the error state."
        );
        describe_histogram!("resource_fetch_ms", "Fetch duration in milliseconds.");
    });
}

struct Entry<T> {
    record: ResourceRecord<T>,
    listeners: Vec<(u64, Listener<T>)>,
    /// Transitions not yet delivered, oldest first.
    outbox: VecDeque<ResourceRecord<T>>,
    delivering: bool,
}

impl<T> Entry<T> {
    fn new(key: ResourceKey) -> Self {
        Self {
            record: ResourceRecord::idle(key),
            listeners: Vec::new(),
            outbox: VecDeque::new(),
            delivering: false,
        }
    }

    /// Queue the current record. Returns true when the caller became the drainer.
    fn enqueue_current(&mut self) -> bool {
        self.outbox.push_back(self.record.clone());
        !std::mem::replace(&mut self.delivering, true)
    }

    fn listeners(&self) -> Vec<Listener<T>> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

struct Inner<T> {
    source: Arc<dyn DataSource<T>>,
    entries: Mutex<HashMap<ResourceKey, Entry<T>>>,
    next_id: AtomicU64,
}

/// A started cycle whose `Loading` transition is queued but maybe not delivered.
struct Started<T> {
    record: ResourceRecord<T>,
    drain: bool,
    fulfiller: Fulfiller<T>,
    fetch_id: u64,
}

/// Cloneable handle to a shared resource cache.
pub struct ResourceCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    pub fn new(source: Arc<dyn DataSource<T>>) -> Self {
        ensure_metrics_described();
        Self {
            inner: Arc::new(Inner {
                source,
                entries: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.inner.source.name()
    }

    /// Current record for `key`; starts a fetch when the record is `Idle`.
    pub fn get(&self, key: &ResourceKey) -> ResourceRecord<T> {
        let started = {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(key.clone()));
            match entry.record.state() {
                ResourceState::Idle => self.begin_cycle(entry),
                ResourceState::Loading(_) => {
                    counter!("resource_fetch_joined_total", "key" => key.to_string())
                        .increment(1);
                    return entry.record.clone();
                }
                _ => return entry.record.clone(),
            }
        };
        self.launch(started)
    }

    /// Read the record without side effects.
    pub fn peek(&self, key: &ResourceKey) -> Option<ResourceRecord<T>> {
        self.inner
            .entries
            .lock()
            .get(key)
            .map(|e| e.record.clone())
    }

    /// Re-fetch a settled record. Returns `false` (and does nothing) while a
    /// fetch is already in flight.
    pub fn invalidate(&self, key: &ResourceKey) -> bool {
        let started = {
            let mut entries = self.inner.entries.lock();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(key.clone()));
            if let ResourceState::Loading(_) = entry.record.state() {
                debug!(target: "resource", key = %key, "invalidate ignored: fetch in flight");
                return false;
            }
            self.begin_cycle(entry)
        };
        self.launch(started);
        true
    }

    /// Resolve `key`, waiting on the shared in-flight fetch if necessary.
    pub async fn fetch(&self, key: &ResourceKey) -> FetchOutcome<T> {
        let record = self.get(key);
        match record.state() {
            ResourceState::Success(v) => Ok(Arc::clone(v)),
            ResourceState::Error(e) => Err(e.clone()),
            ResourceState::Loading(h) => h.wait().await,
            ResourceState::Idle => Err(FetchFailure::new(key, "resource never started loading")),
        }
    }

    /// Register `listener` for every transition of `key`. Does not start a fetch.
    pub fn subscribe<F>(&self, key: &ResourceKey, listener: F) -> Subscription<T>
    where
        F: Fn(&ResourceRecord<T>) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener<T> = Arc::new(listener);
        self.inner
            .entries
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Entry::new(key.clone()))
            .listeners
            .push((id, listener));
        Subscription {
            cache: Arc::downgrade(&self.inner),
            key: key.clone(),
            id,
        }
    }

    /// Keys with a record, in no particular order.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.inner.entries.lock().keys().cloned().collect()
    }

    fn begin_cycle(&self, entry: &mut Entry<T>) -> Started<T> {
        let fetch_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let key = entry.record.key().clone();
        let (fulfiller, handle) = inflight::channel(fetch_id, key);
        entry.record.start_cycle(handle);
        Started {
            record: entry.record.clone(),
            drain: entry.enqueue_current(),
            fulfiller,
            fetch_id,
        }
    }

    /// Announce `Loading`, then hand the fetch to the runtime.
    fn launch(&self, started: Started<T>) -> ResourceRecord<T> {
        let Started {
            record,
            drain,
            fulfiller,
            fetch_id,
        } = started;
        let key = record.key().clone();

        debug!(target: "resource", key = %key, cycle = record.cycle(), source = self.source_name(), "fetch started");
        counter!("resource_fetch_started_total", "key" => key.to_string()).increment(1);
        if drain {
            self.drain(&key);
        }

        let settle = Settle {
            cache: self.clone(),
            key,
            fetch_id,
            fulfiller: Some(fulfiller),
        };
        match Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    let t0 = Instant::now();
                    let outcome = settle
                        .cache
                        .inner
                        .source
                        .fetch(&settle.key)
                        .await
                        .map(Arc::new)
                        .map_err(|e| FetchFailure::from_error(&settle.key, &e));
                    histogram!("resource_fetch_ms", "key" => settle.key.to_string())
                        .record(t0.elapsed().as_secs_f64() * 1_000.0);
                    settle.finish(outcome);
                });
            }
            Err(_) => {
                let failure =
                    FetchFailure::new(&settle.key, "no async runtime available to run the fetch");
                settle.finish(Err(failure));
            }
        }

        record
    }

    fn complete(
        &self,
        key: &ResourceKey,
        fetch_id: u64,
        outcome: FetchOutcome<T>,
        fulfiller: Fulfiller<T>,
    ) {
        let drain = {
            let mut entries = self.inner.entries.lock();
            match entries.get_mut(key) {
                // only the cycle that owns the in-flight handle may settle the record
                Some(entry)
                    if entry
                        .record
                        .inflight()
                        .is_some_and(|h| h.id() == fetch_id) =>
                {
                    let state = match &outcome {
                        Ok(v) => ResourceState::Success(Arc::clone(v)),
                        Err(e) => ResourceState::Error(e.clone()),
                    };
                    entry.record.set(state);
                    entry.enqueue_current()
                }
                _ => false,
            }
        };

        match &outcome {
            Ok(_) => debug!(target: "resource", key = %key, fetch_id, "fetch succeeded"),
            Err(e) => {
                warn!(target: "resource", key = %key, fetch_id, error = %e.message, "fetch failed");
                counter!("resource_fetch_failed_total", "key" => key.to_string()).increment(1);
            }
        }

        if drain {
            self.drain(key);
        }
        fulfiller.fulfill(outcome);
    }

    /// Deliver queued transitions for `key` until the outbox is empty.
    /// Listeners are read at delivery time, so an unsubscribe takes effect
    /// for every transition not yet delivered.
    fn drain(&self, key: &ResourceKey) {
        let mut guard = DrainGuard {
            inner: &self.inner,
            key,
            armed: true,
        };
        loop {
            let (record, listeners) = {
                let mut entries = self.inner.entries.lock();
                let Some(entry) = entries.get_mut(key) else {
                    guard.armed = false;
                    return;
                };
                match entry.outbox.pop_front() {
                    Some(record) => (record, entry.listeners()),
                    None => {
                        entry.delivering = false;
                        guard.armed = false;
                        return;
                    }
                }
            };
            notify(&listeners, &record);
        }
    }

    fn unsubscribe(inner: &Inner<T>, key: &ResourceKey, id: u64) -> bool {
        let mut entries = inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        let before = entry.listeners.len();
        entry.listeners.retain(|(lid, _)| *lid != id);
        entry.listeners.len() != before
    }
}

/// Settles a cycle exactly once. Dropped without `finish` (the fetch panicked
/// or its task was cancelled), it records a failure so the key can be retried.
struct Settle<T: Send + Sync + 'static> {
    cache: ResourceCache<T>,
    key: ResourceKey,
    fetch_id: u64,
    fulfiller: Option<Fulfiller<T>>,
}

impl<T: Send + Sync + 'static> Settle<T> {
    fn finish(mut self, outcome: FetchOutcome<T>) {
        if let Some(fulfiller) = self.fulfiller.take() {
            self.cache.complete(&self.key, self.fetch_id, outcome, fulfiller);
        }
    }
}

impl<T: Send + Sync + 'static> Drop for Settle<T> {
    fn drop(&mut self) {
        if let Some(fulfiller) = self.fulfiller.take() {
            let failure = FetchFailure::new(&self.key, "fetch aborted before producing a result");
            self.cache.complete(&self.key, self.fetch_id, Err(failure), fulfiller);
        }
    }
}

/// Releases the drainer role if a listener panics mid-delivery, so later
/// transitions for the key are not stuck in the outbox.
struct DrainGuard<'a, T> {
    inner: &'a Inner<T>,
    key: &'a ResourceKey,
    armed: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(entry) = self.inner.entries.lock().get_mut(self.key) {
                entry.delivering = false;
            }
        }
    }
}

fn notify<T>(listeners: &[Listener<T>], record: &ResourceRecord<T>) {
    for l in listeners {
        l(record);
    }
}

/// Token returned by [`ResourceCache::subscribe`].
#[must_use = "keep the subscription and call `unsubscribe` to stop notifications"]
pub struct Subscription<T> {
    cache: Weak<Inner<T>>,
    key: ResourceKey,
    id: u64,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Deregister the listener. An in-flight fetch still completes for everyone else.
    pub fn unsubscribe(self) -> bool {
        match self.cache.upgrade() {
            Some(inner) => ResourceCache::unsubscribe(&inner, &self.key, self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::LoadStatus;
    use anyhow::Result;
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl DataSource<u32> for Counting {
        async fn fetch(&self, _key: &ResourceKey) -> Result<u32> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting_cache() -> (ResourceCache<u32>, Arc<Counting>) {
        let src = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        (ResourceCache::new(src.clone()), src)
    }

    #[tokio::test]
    async fn get_starts_loading_and_settles() {
        let (cache, src) = counting_cache();
        let key = ResourceKey::new("k");

        let rec = cache.get(&key);
        assert_eq!(rec.status(), LoadStatus::Loading);
        assert_eq!(rec.cycle(), 1);

        let v = cache.fetch(&key).await.unwrap();
        assert_eq!(*v, 1);
        assert_eq!(cache.peek(&key).unwrap().status(), LoadStatus::Success);
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_alone_does_not_fetch() {
        let (cache, src) = counting_cache();
        let key = ResourceKey::new("k");
        let sub = cache.subscribe(&key, |_| {});
        tokio::task::yield_now().await;
        assert_eq!(cache.peek(&key).unwrap().status(), LoadStatus::Idle);
        assert_eq!(src.calls.load(Ordering::SeqCst), 0);
        assert!(sub.unsubscribe());
    }

    #[test]
    fn get_without_runtime_settles_as_error() {
        let (cache, src) = counting_cache();
        let key = ResourceKey::new("k");
        let rec = cache.get(&key);
        assert_eq!(rec.status(), LoadStatus::Loading);
        let now = cache.peek(&key).unwrap();
        assert_eq!(now.status(), LoadStatus::Error);
        assert!(now.error().unwrap().message.contains("no async runtime"));
        assert_eq!(src.calls.load(Ordering::SeqCst), 0);
    }
}
