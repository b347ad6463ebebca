use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    provider_quota_exhausted: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    info!("GET /health - Health check");
    Json(HealthResponse {
        status: "ok",
        provider_quota_exhausted: state.quotes.failures().quota_exhausted(),
    })
}
