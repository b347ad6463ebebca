use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{ChartData, LookupParams};
use crate::routes::current_user::CurrentUser;
use crate::services::lookup_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:symbol", get(lookup_symbol))
}

async fn lookup_symbol(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(symbol): Path<String>,
    Query(params): Query<LookupParams>,
) -> Result<Json<ChartData>, AppError> {
    info!(
        "GET /api/lookup/{} - {} for user {}",
        symbol,
        params.interval.function(),
        user.username
    );

    let chart = lookup_service::lookup_and_chart(&state.quotes, &symbol, params.interval)
        .await
        .map_err(|e| {
            warn!("Lookup of {} failed: {}", symbol, e);
            e
        })?;

    Ok(Json(chart))
}
