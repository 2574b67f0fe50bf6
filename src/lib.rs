// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod compose;
pub mod config;
pub mod dashboard;
pub mod metric;
pub mod metrics;
pub mod news;
pub mod resource;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::compose::{compose, Section, SectionBody};
pub use crate::config::DashboardConfig;
pub use crate::dashboard::{Dashboard, DashboardView};
pub use crate::metric::{render, MetricDescriptor, MetricError, MetricKind, RenderPlan};
pub use crate::resource::{
    DataSource, FetchFailure, LoadStatus, ResourceCache, ResourceKey, ResourceRecord,
    ResourceState,
};

use std::sync::Arc;

/// Build the full in-process app (dashboard routes only, no recorder install).
pub fn app(cfg: DashboardConfig) -> anyhow::Result<axum::Router> {
    let dashboard = Arc::new(Dashboard::from_config(cfg)?);
    Ok(create_router(dashboard))
}
