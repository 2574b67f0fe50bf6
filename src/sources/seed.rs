// src/sources/seed.rs
use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::metric::{wire::decode_metric_set, MetricSet};
use crate::news::NewsFeed;
use crate::resource::{DataSource, ResourceKey};

const SEED_NEWS: &str = include_str!("../../data/industry-news.json");
const SEED_METRICS: &str = include_str!("../../data/market-metrics.json");

/// Embedded demo news feed.
pub fn industry_news() -> Result<NewsFeed> {
    NewsFeed::from_json(SEED_NEWS).context("decoding embedded news seed")
}

/// Embedded demo metrics.
pub fn market_metrics() -> Result<MetricSet> {
    decode_metric_set(SEED_METRICS).context("decoding embedded metrics seed")
}

/// Serves fixed payloads per key, optionally after a simulated delay.
pub struct StaticSource<T> {
    payloads: HashMap<ResourceKey, T>,
    latency: Duration,
}

impl<T> Default for StaticSource<T> {
    fn default() -> Self {
        Self {
            payloads: HashMap::new(),
            latency: Duration::ZERO,
        }
    }
}

impl<T> StaticSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<ResourceKey>, payload: T) -> Self {
        self.payloads.insert(key.into(), payload);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl<T> DataSource<T> for StaticSource<T>
where
    T: Clone + Send + Sync,
{
    async fn fetch(&self, key: &ResourceKey) -> Result<T> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.payloads
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("no payload registered for '{key}'"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
