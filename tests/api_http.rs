// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /dashboard (pending and settled)
// - GET /resources/{key}, POST /resources/{key}/invalidate
// - POST /render (plan, unsupported kind, malformed payload)

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use crypto_insights_dashboard::{app, DashboardConfig};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, backed by the embedded seeds.
fn test_router() -> Router {
    app(DashboardConfig::default()).expect("router builds from default config")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn section_statuses(view: &Json) -> Vec<(String, String)> {
    view["sections"]
        .as_array()
        .expect("sections array")
        .iter()
        .map(|s| {
            let status = s["body"]["status"].as_str().unwrap_or("-").to_string();
            (s["section"].as_str().unwrap_or("?").to_string(), status)
        })
        .collect()
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn first_dashboard_view_is_all_placeholders() {
    let app = test_router();
    let (status, v) = send(&app, get("/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["title"], "Crypto Insights Dashboard");
    assert_eq!(
        section_statuses(&v),
        vec![
            ("news".into(), "placeholder".into()),
            ("news".into(), "placeholder".into()),
            ("metrics".into(), "placeholder".into()),
            ("spotlight".into(), "-".into()),
        ]
    );
}

#[tokio::test]
async fn settled_dashboard_view_has_ready_sections() {
    let app = test_router();
    let (status, v) = send(&app, get("/dashboard?wait=true")).await;
    assert_eq!(status, StatusCode::OK);

    let statuses: Vec<_> = section_statuses(&v).into_iter().map(|(_, s)| s).collect();
    assert_eq!(statuses, ["ready", "ready", "ready", "-"]);

    let rows = v["sections"][2]["body"]["content"]
        .as_array()
        .expect("metric rows");
    let kinds: Vec<_> = rows.iter().map(|r| r["row"].as_str().unwrap_or("")).collect();
    assert_eq!(kinds, ["paired", "full_width", "full_width"]);
    assert_eq!(rows[0]["cards"][1]["plan"]["plan"], "categorical_bar");

    assert_eq!(v["sections"][3]["panel"]["heading"], "Project Spotlight: Uniswap V3");
}

#[tokio::test]
async fn resource_status_and_invalidate() {
    let app = test_router();

    let (status, v) = send(&app, get("/resources/industry-news")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "idle");
    assert_eq!(v["cycle"], 0);

    let _ = send(&app, get("/dashboard?wait=true")).await;
    let (_, v) = send(&app, get("/resources/industry-news")).await;
    assert_eq!(v["status"], "success");
    assert_eq!(v["cycle"], 1);

    let (status, v) = send(&app, post_json("/resources/industry-news/invalidate", &json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(v["started"], true);
    assert_eq!(v["key"], "industry-news");
    assert_eq!(v["cycle"], 2);
}

#[tokio::test]
async fn unknown_resource_is_404() {
    let app = test_router();
    let (status, v) = send(&app, get("/resources/price-feed")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"], "unknown_resource");

    let (status, _) = send(&app, post_json("/resources/price-feed/invalidate", &json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn render_returns_plan_or_422() {
    let app = test_router();

    let bar = json!({
        "title": "Smart Contract Deployments",
        "chartType": "bar",
        "data": [ { "name": "ETH", "value": 5000 }, { "name": "BSC", "value": 3500 } ]
    });
    let (status, v) = send(&app, post_json("/render", &bar)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["plan"], "categorical_bar");
    assert_eq!(v["bars"][0]["label"], "ETH");

    let pie = json!({ "title": "Share", "chartType": "pie", "data": [] });
    let (status, v) = send(&app, post_json("/render", &pie)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"], "unsupported_metric_kind");

    let broken = json!({
        "title": "Daily Active Addresses",
        "chartType": "line",
        "data": [ { "name": "Jan", "BTC": 1, "ETH": 2 }, { "name": "Feb", "BTC": 3 } ]
    });
    let (status, v) = send(&app, post_json("/render", &broken)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"], "malformed_metric");
    assert!(v["message"].as_str().unwrap_or("").contains("'ETH'"));
}
