// src/resource/source.rs
use anyhow::Result;
use thiserror::Error;

use super::ResourceKey;

/// Anything that can eventually produce the payload for a key.
#[async_trait::async_trait]
pub trait DataSource<T>: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<T>;
    fn name(&self) -> &'static str;
}

/// A rejected fetch, captured into the record as data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch of '{key}' failed: {message}")]
pub struct FetchFailure {
    pub key: ResourceKey,
    pub message: String,
}

impl FetchFailure {
    pub fn new(key: &ResourceKey, message: impl Into<String>) -> Self {
        Self {
            key: key.clone(),
            message: message.into(),
        }
    }

    /// Flatten an error chain into a failure descriptor.
    pub fn from_error(key: &ResourceKey, err: &anyhow::Error) -> Self {
        Self::new(key, format!("{err:#}"))
    }
}
