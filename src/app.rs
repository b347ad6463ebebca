use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{health, lookup, watchlists};
use crate::state::AppState;

/// `request_budget` bounds a whole request, including any refresh pass it runs.
///
/// All users share one provider rate limiter, so a refresh pass queued behind
/// other users' passes can run out of budget. The request is then dropped and
/// snapshots fetched so far are not written; the entries stay stale and are
/// fetched again on the next request. Configuration only guarantees the budget
/// covers a single pass on an idle limiter (`AppConfig::full_refresh_duration`).
pub fn create_app(state: AppState, request_budget: Duration) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/watchlist", watchlists::router())
        .nest("/api/lookup", lookup::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_budget))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
