// src/config/dashboard.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

pub const DEFAULT_NEWS_KEY: &str = "industry-news";
pub const DEFAULT_METRICS_KEY: &str = "market-metrics";

fn default_title() -> String {
    "Crypto Insights Dashboard".to_string()
}
fn default_news_key() -> String {
    DEFAULT_NEWS_KEY.to_string()
}
fn default_metrics_key() -> String {
    DEFAULT_METRICS_KEY.to_string()
}

/// Headings of the composed sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionTitles {
    pub partnerships: String,
    pub raises: String,
    pub metrics: String,
    pub spotlight: String,
}

impl Default for SectionTitles {
    fn default() -> Self {
        Self {
            partnerships: "Brand Partnerships".to_string(),
            raises: "VC Raises & Announcements".to_string(),
            metrics: "Market Metrics".to_string(),
            spotlight: "Project Spotlight".to_string(),
        }
    }
}

/// Author-curated featured project. Static, never goes through the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spotlight {
    pub name: String,
    pub image: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Default for Spotlight {
    fn default() -> Self {
        Self {
            name: "Uniswap V3".to_string(),
            image: "https://uniswap.org/images/twitter-card.jpg".to_string(),
            description: "Uniswap V3 introduces concentrated liquidity, allowing liquidity providers to allocate capital more efficiently and potentially earn higher returns.".to_string(),
            link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_news_key")]
    pub news_key: String,
    #[serde(default = "default_metrics_key")]
    pub metrics_key: String,
    /// Directory with `<key>.json` payloads. When absent the embedded seed data is served.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Artificial delay applied by the sources, to exercise loading states.
    #[serde(default)]
    pub simulated_latency_ms: u64,
    #[serde(default)]
    pub sections: SectionTitles,
    #[serde(default)]
    pub spotlight: Spotlight,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            news_key: default_news_key(),
            metrics_key: default_metrics_key(),
            data_dir: None,
            simulated_latency_ms: 0,
            sections: SectionTitles::default(),
            spotlight: Spotlight::default(),
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let cfg: DashboardConfig = toml::from_str(s)?;
        cfg.sanitized()
    }

    /// Load using env var + fallbacks:
    /// 1) $DASHBOARD_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Result<Self> {
        self.news_key = self.news_key.trim().to_string();
        self.metrics_key = self.metrics_key.trim().to_string();
        if self.news_key.is_empty() {
            self.news_key = default_news_key();
        }
        if self.metrics_key.is_empty() {
            self.metrics_key = default_metrics_key();
        }
        // one key, one payload shape
        if self.news_key == self.metrics_key {
            bail!("news_key and metrics_key must differ (both are '{}')", self.news_key);
        }
        if self.title.trim().is_empty() {
            self.title = default_title();
        }
        Ok(self)
    }
}
