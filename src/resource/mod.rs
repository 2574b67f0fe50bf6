// src/resource/mod.rs
//! Named async resources and their lifecycle records.
//!
//! A [`ResourceRecord`] is the read-only view consumers get from the
//! [`ResourceCache`]. The state enum carries the value, the error or the
//! in-flight handle, so a record can never hold a value and an error at once.

pub mod cache;
pub mod inflight;
pub mod source;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use cache::{ResourceCache, Subscription};
pub use inflight::InflightHandle;
pub use source::{DataSource, FetchFailure};

/// Stable identifier of a logical data source (e.g. `industry-news`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(Arc<str>);

impl ResourceKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Payload-free lifecycle tag, handy for presentation and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl LoadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadStatus::Success | LoadStatus::Error)
    }
}

/// Lifecycle state of one resource.
#[derive(Debug)]
pub enum ResourceState<T> {
    Idle,
    Loading(InflightHandle<T>),
    Success(Arc<T>),
    Error(FetchFailure),
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        match self {
            ResourceState::Idle => ResourceState::Idle,
            ResourceState::Loading(h) => ResourceState::Loading(h.clone()),
            ResourceState::Success(v) => ResourceState::Success(Arc::clone(v)),
            ResourceState::Error(e) => ResourceState::Error(e.clone()),
        }
    }
}

impl<T> ResourceState<T> {
    pub fn status(&self) -> LoadStatus {
        match self {
            ResourceState::Idle => LoadStatus::Idle,
            ResourceState::Loading(_) => LoadStatus::Loading,
            ResourceState::Success(_) => LoadStatus::Success,
            ResourceState::Error(_) => LoadStatus::Error,
        }
    }
}

/// Snapshot of a resource as seen by a consumer.
#[derive(Debug)]
pub struct ResourceRecord<T> {
    key: ResourceKey,
    /// Number of fetch cycles started for this key (0 while `Idle`).
    cycle: u64,
    state: ResourceState<T>,
}

impl<T> Clone for ResourceRecord<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            cycle: self.cycle,
            state: self.state.clone(),
        }
    }
}

impl<T> ResourceRecord<T> {
    pub(crate) fn idle(key: ResourceKey) -> Self {
        Self {
            key,
            cycle: 0,
            state: ResourceState::Idle,
        }
    }

    /// Build a record outside the cache, e.g. for composing a view from
    /// values held elsewhere.
    pub fn from_parts(key: ResourceKey, cycle: u64, state: ResourceState<T>) -> Self {
        Self { key, cycle, state }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn state(&self) -> &ResourceState<T> {
        &self.state
    }

    pub fn status(&self) -> LoadStatus {
        self.state.status()
    }

    pub fn value(&self) -> Option<&Arc<T>> {
        match &self.state {
            ResourceState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchFailure> {
        match &self.state {
            ResourceState::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn inflight(&self) -> Option<&InflightHandle<T>> {
        match &self.state {
            ResourceState::Loading(h) => Some(h),
            _ => None,
        }
    }

    /// `Idle` counts as pending: reading it through the cache starts a fetch.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ResourceState::Idle | ResourceState::Loading(_))
    }

    pub(crate) fn set(&mut self, state: ResourceState<T>) {
        self.state = state;
    }

    pub(crate) fn start_cycle(&mut self, handle: InflightHandle<T>) {
        self.cycle += 1;
        self.state = ResourceState::Loading(handle);
    }
}
