//! Crypto Insights Dashboard: binary entrypoint.
//! Boots the Axum HTTP server with the dashboard routes and `/metrics`.

use std::sync::Arc;

use crypto_insights_dashboard::{api, metrics::Metrics, Dashboard, DashboardConfig};
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DASHBOARD_DEV_LOG=1
/// DASHBOARD_LOG_JSON=1 switches the output to JSON lines.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DASHBOARD_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("resource=debug,compose=info,dashboard=info,api=info,warn"));

    let json = std::env::var("DASHBOARD_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = DashboardConfig::load_default()?;
    let metrics = Metrics::init(cfg.simulated_latency_ms)?;
    let dashboard = Arc::new(Dashboard::from_config(cfg)?);

    // Warm both resources so the first page view already has data in flight.
    let _ = dashboard.snapshot();
    info!(
        news = %dashboard.news_key(),
        metrics = %dashboard.metrics_key(),
        "dashboard resources requested"
    );

    let router = api::create_router(dashboard).merge(metrics.router());

    Ok(router.into())
}
