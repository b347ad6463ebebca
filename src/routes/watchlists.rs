use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Local};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AddWatchlistEntryRequest, RefreshSummary, WatchlistEntryResponse, WatchlistResponse};
use crate::routes::current_user::CurrentUser;
use crate::services::watchlist_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        // Specific routes BEFORE parameterized routes
        .route("/refresh", post(refresh_watchlist))
        .route("/", get(get_watchlist).post(add_entry))
        .route("/:entry_id", delete(remove_entry))
}

/// Staleness is judged against the server's local calendar date.
fn server_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

async fn get_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<WatchlistResponse>, AppError> {
    info!("GET /api/watchlist - user {}", user.username);

    let response = watchlist_service::load_watchlist(
        state.store.as_ref(),
        &state.quotes,
        user.id,
        server_now(),
    )
    .await?;

    Ok(Json(response))
}

async fn refresh_watchlist(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<RefreshSummary>, AppError> {
    info!("POST /api/watchlist/refresh - user {}", user.username);

    let summary = watchlist_service::refresh_watchlist(
        state.store.as_ref(),
        &state.quotes,
        user.id,
        server_now(),
    )
    .await?;

    Ok(Json(summary))
}

async fn add_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<AddWatchlistEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("POST /api/watchlist - user {} adds {}", user.username, req.symbol);

    let entry = watchlist_service::add_to_watchlist(
        state.store.as_ref(),
        &state.quotes,
        user.id,
        &req.symbol,
        server_now(),
    )
    .await
    .map_err(|e| {
        warn!("Could not add {} for {}: {}", req.symbol, user.username, e);
        e
    })?;

    Ok((StatusCode::CREATED, Json(WatchlistEntryResponse::from(entry))))
}

async fn remove_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /api/watchlist/{} - user {}", entry_id, user.username);

    watchlist_service::remove_from_watchlist(state.store.as_ref(), user.id, entry_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
