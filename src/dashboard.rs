// src/dashboard.rs
//! Dashboard facade: owns the two resource caches and the static spotlight,
//! and composes them into a [`DashboardView`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::compose::{compose, Section};
use crate::config::DashboardConfig;
use crate::metric::MetricSet;
use crate::news::NewsFeed;
use crate::resource::{DataSource, LoadStatus, ResourceCache, ResourceKey, ResourceRecord};
use crate::sources::{seed, JsonFileSource, StaticSource};

/// Composed page, ready for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

/// Lifecycle summary of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub key: ResourceKey,
    pub status: LoadStatus,
    pub cycle: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Dashboard {
    cfg: DashboardConfig,
    news_key: ResourceKey,
    metrics_key: ResourceKey,
    news: ResourceCache<NewsFeed>,
    metrics: ResourceCache<MetricSet>,
}

impl Dashboard {
    pub fn new(
        cfg: DashboardConfig,
        news_source: Arc<dyn DataSource<NewsFeed>>,
        metrics_source: Arc<dyn DataSource<MetricSet>>,
    ) -> Self {
        Self {
            news_key: ResourceKey::new(&cfg.news_key),
            metrics_key: ResourceKey::new(&cfg.metrics_key),
            news: ResourceCache::new(news_source),
            metrics: ResourceCache::new(metrics_source),
            cfg,
        }
    }

    /// Pick sources from config: `data_dir` files when set, embedded seeds otherwise.
    pub fn from_config(cfg: DashboardConfig) -> Result<Self> {
        let latency = Duration::from_millis(cfg.simulated_latency_ms);
        let news: Arc<dyn DataSource<NewsFeed>>;
        let metrics: Arc<dyn DataSource<MetricSet>>;
        match &cfg.data_dir {
            Some(dir) => {
                news = Arc::new(JsonFileSource::news(dir.clone()).with_latency(latency));
                metrics = Arc::new(JsonFileSource::metrics(dir.clone()).with_latency(latency));
            }
            None => {
                news = Arc::new(
                    StaticSource::new()
                        .with(cfg.news_key.as_str(), seed::industry_news()?)
                        .with_latency(latency),
                );
                metrics = Arc::new(
                    StaticSource::new()
                        .with(cfg.metrics_key.as_str(), seed::market_metrics()?)
                        .with_latency(latency),
                );
            }
        }
        info!(
            target: "dashboard",
            news_source = news.name(),
            metrics_source = metrics.name(),
            latency_ms = cfg.simulated_latency_ms,
            "dashboard sources ready"
        );
        Ok(Self::new(cfg, news, metrics))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.cfg
    }

    pub fn news_key(&self) -> &ResourceKey {
        &self.news_key
    }

    pub fn metrics_key(&self) -> &ResourceKey {
        &self.metrics_key
    }

    pub fn news_cache(&self) -> &ResourceCache<NewsFeed> {
        &self.news
    }

    pub fn metrics_cache(&self) -> &ResourceCache<MetricSet> {
        &self.metrics
    }

    /// Compose from whatever the caches hold now, starting fetches as needed.
    pub fn snapshot(&self) -> DashboardView {
        let news = self.news.get(&self.news_key);
        let metrics = self.metrics.get(&self.metrics_key);
        DashboardView {
            title: self.cfg.title.clone(),
            generated_at: Utc::now(),
            sections: compose(&news, &metrics, &self.cfg.spotlight, &self.cfg.sections),
        }
    }

    /// Wait for both resources to settle, then compose.
    pub async fn settled_snapshot(&self) -> DashboardView {
        let (news, metrics) = tokio::join!(
            self.news.fetch(&self.news_key),
            self.metrics.fetch(&self.metrics_key)
        );
        // failures are already in the records and compose into error sections
        if let Err(e) = news {
            debug!(target: "dashboard", key = %self.news_key, error = %e.message, "news settled as error");
        }
        if let Err(e) = metrics {
            debug!(target: "dashboard", key = %self.metrics_key, error = %e.message, "metrics settled as error");
        }
        self.snapshot()
    }

    /// Invalidate one resource. `None` for an unknown key, `Some(false)` when
    /// a fetch was already in flight.
    pub fn refresh(&self, key: &ResourceKey) -> Option<bool> {
        if *key == self.news_key {
            Some(self.news.invalidate(key))
        } else if *key == self.metrics_key {
            Some(self.metrics.invalidate(key))
        } else {
            None
        }
    }

    /// Status of one resource without triggering a fetch.
    pub fn status(&self, key: &ResourceKey) -> Option<ResourceStatus> {
        if *key == self.news_key {
            Some(status_of(key, self.news.peek(key)))
        } else if *key == self.metrics_key {
            Some(status_of(key, self.metrics.peek(key)))
        } else {
            None
        }
    }
}

fn status_of<T>(key: &ResourceKey, record: Option<ResourceRecord<T>>) -> ResourceStatus {
    match record {
        Some(r) => ResourceStatus {
            key: key.clone(),
            status: r.status(),
            cycle: r.cycle(),
            error: r.error().map(|e| e.message.clone()),
        },
        None => ResourceStatus {
            key: key.clone(),
            status: LoadStatus::Idle,
            cycle: 0,
            error: None,
        },
    }
}
