// src/sources/json_file.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::metric::{wire::decode_metric_set, MetricSet};
use crate::news::NewsFeed;
use crate::resource::{DataSource, ResourceKey};

pub type Decoder<T> = fn(&str) -> Result<T>;

/// Reads `<dir>/<key>.json` on every fetch and decodes it.
pub struct JsonFileSource<T> {
    dir: PathBuf,
    decode: Decoder<T>,
    latency: Duration,
}

impl<T> JsonFileSource<T> {
    pub fn new(dir: impl Into<PathBuf>, decode: Decoder<T>) -> Self {
        Self {
            dir: dir.into(),
            decode,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl JsonFileSource<NewsFeed> {
    pub fn news(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, NewsFeed::from_json)
    }
}

impl JsonFileSource<MetricSet> {
    pub fn metrics(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, |s| Ok(decode_metric_set(s)?))
    }
}

#[async_trait]
impl<T: Send + Sync> DataSource<T> for JsonFileSource<T> {
    async fn fetch(&self, key: &ResourceKey) -> Result<T> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let path = self.path_for(key);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        (self.decode)(&content).with_context(|| format!("decoding {}", path.display()))
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
