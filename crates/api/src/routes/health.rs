use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use routebook_store::row::ROW_WIDTH;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    workbook_ok: bool,
}

/// GET /health
///
/// Liveness probe: reports the package version and whether the workbook
/// engine answers a trivial read.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let workbook_ok = state
        .store
        .engine()
        .read_range(state.store.sheet(), 1, 1, 1, ROW_WIDTH as u32)
        .is_ok();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        workbook_ok,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
