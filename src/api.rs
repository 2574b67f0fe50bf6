// src/api.rs
//! HTTP presentation host. Serves composed dashboard views and resource
//! status as JSON; the core itself knows nothing about HTTP.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::dashboard::{Dashboard, DashboardView, ResourceStatus};
use crate::metric::dispatch::record_render_error;
use crate::metric::{render_wire, RenderPlan};
use crate::resource::ResourceKey;

#[derive(Clone)]
pub struct AppState {
    dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        Self { dashboard }
    }
}

pub fn create_router(dashboard: Arc<Dashboard>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/dashboard", get(dashboard_view))
        .route("/resources/{key}", get(resource_status))
        .route("/resources/{key}/invalidate", post(invalidate_resource))
        .route("/render", post(render_metric))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState::new(dashboard))
}

#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    #[serde(default)]
    wait: bool,
}

async fn dashboard_view(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Json<DashboardView> {
    let view = if q.wait {
        state.dashboard.settled_snapshot().await
    } else {
        state.dashboard.snapshot()
    };
    Json(view)
}

#[derive(Serialize)]
struct ErrorOut {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: String) -> Response {
    (status, Json(ErrorOut { error, message })).into_response()
}

fn unknown_key(key: &ResourceKey) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "unknown_resource",
        format!("no resource named '{key}'"),
    )
}

async fn resource_status(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key = ResourceKey::from(key);
    match state.dashboard.status(&key) {
        Some(status) => Json(status).into_response(),
        None => unknown_key(&key),
    }
}

#[derive(Serialize)]
struct InvalidateOut {
    started: bool,
    #[serde(flatten)]
    status: ResourceStatus,
}

async fn invalidate_resource(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let key = ResourceKey::from(key);
    let Some(started) = state.dashboard.refresh(&key) else {
        return unknown_key(&key);
    };
    info!(target: "api", key = %key, started, "invalidate requested");
    match state.dashboard.status(&key) {
        Some(status) => {
            (StatusCode::ACCEPTED, Json(InvalidateOut { started, status })).into_response()
        }
        None => unknown_key(&key),
    }
}

async fn render_metric(Json(raw): Json<serde_json::Value>) -> Response {
    match render_wire(&raw) {
        Ok(plan) => Json::<RenderPlan>(plan).into_response(),
        Err(e) => {
            record_render_error(&e);
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.code(), e.to_string())
        }
    }
}
