use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use routebook_api::config::ServerConfig;
use routebook_api::lock::RequestLock;
use routebook_api::router::build_app_router;
use routebook_api::state::AppState;
use routebook_store::store::RouteStore;
use routebook_store::workbook::Workbook;

/// Build a test `ServerConfig` with safe defaults: in-memory workbook, the
/// dev CORS origin, and short lock/request deadlines.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        lock_wait: Duration::from_millis(200),
        workbook_path: None,
        workbook_create: false,
        routes_sheet: "routes".to_string(),
    }
}

/// Build the full application router over an in-memory workbook, returning
/// the workbook too so tests can inspect or corrupt raw rows.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
pub fn build_test_app_with_engine() -> (Router, Arc<Workbook>) {
    let config = test_config();
    let engine = Arc::new(Workbook::in_memory());
    let store = Arc::new(RouteStore::new(
        engine.clone(),
        config.routes_sheet.clone(),
    ));

    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        lock: RequestLock::new(),
    };

    (build_app_router(state, &config), engine)
}

/// Build the full application router over an in-memory workbook.
pub fn build_test_app() -> Router {
    build_test_app_with_engine().0
}

/// Send a GET request to the app.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request must build");
    app.clone().oneshot(request).await.expect("request must run")
}

/// Send a POST request with a form-urlencoded body to the app.
pub async fn post_form(app: &Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request must build");
    app.clone().oneshot(request).await.expect("request must run")
}

/// Collect a response body into parsed JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body must be JSON")
}

/// Collect a response body into a string (for JSONP bodies).
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body must be UTF-8")
}

/// Render parameter pairs as a form-urlencoded string (used both for query
/// strings and POST bodies).
pub fn encode_params(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Query string for a minimal `set-route` request.
pub fn set_route_query(user_id: &str, route_id: &str, route_name: &str, coordinates: &str) -> String {
    encode_params(&[
        ("type", "route"),
        ("user-id", user_id),
        ("route-id", route_id),
        ("route-name", route_name),
        ("description", ""),
        ("note", ""),
        ("coordinates", coordinates),
    ])
}
