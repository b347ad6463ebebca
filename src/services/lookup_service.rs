use tracing::info;

use crate::errors::AppError;
use crate::external::quote_provider::{OutputSize, SeriesKind};
use crate::models::ChartData;
use crate::services::quote_fetcher::{normalize_symbol, QuoteFetcher};

/// Company name plus the closing-price history for a chart, oldest first.
///
/// The overview call doubles as symbol validation, so an unknown ticker never
/// costs a second request.
pub async fn lookup_and_chart(
    fetcher: &QuoteFetcher,
    raw_symbol: &str,
    interval: SeriesKind,
) -> Result<ChartData, AppError> {
    let symbol = normalize_symbol(raw_symbol)
        .ok_or_else(|| AppError::Validation(format!("'{}' is not a ticker symbol", raw_symbol.trim())))?;

    let overview = fetcher
        .overview(&symbol)
        .await
        .map_err(|e| fetcher.error_for(&symbol, e))?;

    let series = fetcher
        .series(&symbol, interval, OutputSize::Compact)
        .await
        .map_err(|e| fetcher.error_for(&symbol, e))?;

    let (dates, prices): (Vec<_>, Vec<_>) = series.iter_asc().unzip();

    info!("📈 Lookup {} ({}): {} points", symbol, interval.function(), dates.len());

    Ok(ChartData {
        company_name: overview.name,
        symbol,
        interval,
        dates,
        prices,
    })
}
