use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use stockwatch_backend::app;
use stockwatch_backend::config::AppConfig;
use stockwatch_backend::external::alphavantage::AlphaVantageProvider;
use stockwatch_backend::logging::{init_logging, LoggingConfig};
use stockwatch_backend::services::failure_cache::FailureCache;
use stockwatch_backend::services::quote_fetcher::QuoteFetcher;
use stockwatch_backend::services::rate_limiter::RateLimiter;
use stockwatch_backend::state::AppState;
use stockwatch_backend::store::PgWatchlistStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let provider = AlphaVantageProvider::new(&config.alphavantage)?;
    tracing::info!(
        "📊 Using Alpha Vantage at {} ({} requests/min)",
        config.alphavantage.base_url,
        config.alphavantage.requests_per_minute
    );

    let quotes = QuoteFetcher::new(
        Arc::new(provider),
        Arc::new(RateLimiter::new(config.alphavantage.requests_per_minute)),
        FailureCache::new(),
    );

    let state = AppState {
        store: Arc::new(PgWatchlistStore::new(pool)),
        quotes,
    };
    let app = app::create_app(state, config.request_budget);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Stockwatch backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
