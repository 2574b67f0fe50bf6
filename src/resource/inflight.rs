// src/resource/inflight.rs
//! Single-fulfillment handle for one fetch cycle.
//!
//! [`channel`] yields a [`Fulfiller`] (owned by the fetch task, consumed on
//! use) and an [`InflightHandle`] that any number of consumers can clone and
//! await. Because `fulfill` takes `self`, a cycle settles at most once.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::{FetchFailure, ResourceKey};

pub type FetchOutcome<T> = Result<Arc<T>, FetchFailure>;

struct Shared<T> {
    id: u64,
    key: ResourceKey,
    rx: watch::Receiver<Option<FetchOutcome<T>>>,
}

/// Shared view of an in-progress fetch.
pub struct InflightHandle<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for InflightHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for InflightHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflightHandle")
            .field("id", &self.inner.id)
            .field("key", &self.inner.key)
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T> InflightHandle<T> {
    /// Fetch id, unique within one cache.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// True when both handles point at the same fetch.
    pub fn same_fetch(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_settled(&self) -> bool {
        self.inner.rx.borrow().is_some()
    }

    /// Wait for the fetch to settle.
    pub async fn wait(&self) -> FetchOutcome<T> {
        let mut rx = self.inner.rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            if rx.changed().await.is_err() {
                let last = rx.borrow().clone();
                return last.unwrap_or_else(|| {
                    Err(FetchFailure::new(
                        &self.inner.key,
                        "fetch task ended without a result",
                    ))
                });
            }
        }
    }
}

/// Write side of an in-flight fetch.
pub(crate) struct Fulfiller<T> {
    tx: watch::Sender<Option<FetchOutcome<T>>>,
}

impl<T> Fulfiller<T> {
    pub(crate) fn fulfill(self, outcome: FetchOutcome<T>) {
        // send_replace stores the value even when nobody is waiting yet
        self.tx.send_replace(Some(outcome));
    }
}

pub(crate) fn channel<T>(id: u64, key: ResourceKey) -> (Fulfiller<T>, InflightHandle<T>) {
    let (tx, rx) = watch::channel(None);
    let handle = InflightHandle {
        inner: Arc::new(Shared { id, key, rx }),
    };
    (Fulfiller { tx }, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn all_waiters_see_the_single_outcome() {
        let (f, h) = channel::<u32>(1, "k".into());
        let h2 = h.clone();
        assert!(h.same_fetch(&h2));
        assert!(!h.is_settled());

        let waiter = tokio::spawn(async move { h2.wait().await });
        tokio::task::yield_now().await;
        f.fulfill(Ok(Arc::new(9)));

        assert_eq!(*h.wait().await.unwrap(), 9);
        assert_eq!(*waiter.await.unwrap().unwrap(), 9);
        assert!(h.is_settled());
    }

    #[tokio::test]
    async fn dropped_fulfiller_resolves_to_failure() {
        let (f, h) = channel::<u32>(2, "news".into());
        drop(f);
        let err = h.wait().await.unwrap_err();
        assert_eq!(err.key.as_str(), "news");
    }

    #[test]
    fn distinct_channels_are_distinct_fetches() {
        let (_f1, a) = channel::<u32>(1, "k".into());
        let (_f2, b) = channel::<u32>(2, "k".into());
        assert!(!a.same_fetch(&b));
        assert_ne!(a.id(), b.id());
    }
}
