use crate::config::AlphaVantageConfig;
use crate::external::quote_provider::{
    CompanyOverview, FetchError, FetchOutcome, OutputSize, QuoteProvider, SeriesKind, TimeSeries,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(config: &AlphaVantageConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> FetchOutcome<AvEnvelope> {
        let url = format!("{}/query", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?
            .error_for_status()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        resp.json::<AvEnvelope>()
            .await
            .map_err(|e| FetchError::Transient(format!("unreadable response body: {}", e)))
    }
}

/// Every Alpha Vantage response is a flat JSON object. Quota exhaustion is
/// reported in-band:
/// `{ "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }`
/// or `{ "Information": "... standard API rate limit is 25 requests per day ..." }`
#[derive(Debug, Deserialize)]
struct AvEnvelope {
    #[serde(rename = "Note")]
    note: Option<Value>,

    #[serde(rename = "Information")]
    information: Option<Value>,

    // { "Error Message": "Invalid API call. ..." }
    #[serde(rename = "Error Message")]
    error_message: Option<Value>,

    #[serde(flatten)]
    fields: HashMap<String, Value>,
}

impl AvEnvelope {
    fn is_rate_limited(&self) -> bool {
        self.note.is_some() || self.information.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct AvBar {
    #[serde(rename = "4. close")]
    close: String,
}

/// Sentinel check always runs first: a throttled reply carries neither `Name`
/// nor a series and would otherwise look like a bad symbol.
fn classify_overview(symbol: &str, mut body: AvEnvelope) -> FetchOutcome<CompanyOverview> {
    if body.is_rate_limited() {
        return Err(FetchError::RateLimited);
    }

    let name = match body.fields.remove("Name") {
        Some(Value::String(name)) => name.trim().to_string(),
        _ => String::new(),
    };

    // The provider spells a missing value as the string "None".
    if name.is_empty() || name == "None" {
        return Err(FetchError::InvalidSymbol);
    }

    Ok(CompanyOverview {
        symbol: symbol.to_string(),
        name,
    })
}

fn classify_series(kind: SeriesKind, mut body: AvEnvelope) -> FetchOutcome<TimeSeries> {
    if body.is_rate_limited() {
        return Err(FetchError::RateLimited);
    }

    let raw = match body.fields.remove(kind.series_key()) {
        Some(raw) => raw,
        None => {
            let detail = match body.error_message {
                Some(msg) => format!("missing {:?}: {}", kind.series_key(), msg),
                None => format!("missing {:?}", kind.series_key()),
            };
            return Err(FetchError::NoData(detail));
        }
    };

    let bars: BTreeMap<String, AvBar> = serde_json::from_value(raw)
        .map_err(|e| FetchError::NoData(format!("malformed series: {}", e)))?;

    let mut series = TimeSeries::new();
    for (date_str, bar) in bars {
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|_| FetchError::NoData(format!("malformed date {:?}", date_str)))?;

        let close = bar
            .close
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite())
            .ok_or_else(|| FetchError::NoData(format!("malformed close on {}", date_str)))?;

        series.insert(date, close);
    }

    // Two dated entries are the minimum to tell today from yesterday.
    if series.len() < 2 {
        return Err(FetchError::NoData(format!(
            "{} dated entries, need at least 2",
            series.len()
        )));
    }

    Ok(series)
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    async fn fetch_series(
        &self,
        symbol: &str,
        kind: SeriesKind,
        size: OutputSize,
    ) -> FetchOutcome<TimeSeries> {
        debug!("Alpha Vantage {} {} ({})", kind.function(), symbol, size.as_str());

        let body = self
            .query(&[
                ("function", kind.function()),
                ("symbol", symbol),
                ("outputsize", size.as_str()),
            ])
            .await?;

        classify_series(kind, body).map_err(|e| {
            warn!("Alpha Vantage {} for {}: {}", kind.function(), symbol, e);
            e
        })
    }

    async fn fetch_overview(&self, symbol: &str) -> FetchOutcome<CompanyOverview> {
        debug!("Alpha Vantage OVERVIEW {}", symbol);

        let body = self
            .query(&[("function", "OVERVIEW"), ("symbol", symbol)])
            .await?;

        classify_overview(symbol, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}", addr)
    }

    fn provider(base_url: String) -> AlphaVantageProvider {
        AlphaVantageProvider::new(&AlphaVantageConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_secs(5),
            requests_per_minute: 5,
        })
        .unwrap()
    }

    async fn daily_series(
        State(seen): State<SeenQueries>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        seen.lock().push(params);
        Json(json!({
            "Meta Data": { "2. Symbol": "IBM" },
            "Time Series (Daily)": {
                "2024-01-05": { "4. close": "100.0" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }))
    }

    fn envelope(value: Value) -> AvEnvelope {
        serde_json::from_value(value).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_rate_limit_wins_over_missing_name() {
        let body = envelope(json!({
            "Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
        }));
        assert_eq!(classify_overview("IBM", body), Err(FetchError::RateLimited));

        let body = envelope(json!({ "Note": "5 calls per minute" }));
        assert_eq!(classify_overview("IBM", body), Err(FetchError::RateLimited));
    }

    #[test]
    fn test_rate_limit_wins_over_series() {
        let body = envelope(json!({
            "Note": "slow down",
            "Time Series (Daily)": {
                "2024-01-05": { "4. close": "100.0" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }));
        assert_eq!(
            classify_series(SeriesKind::Daily, body),
            Err(FetchError::RateLimited)
        );
    }

    #[test]
    fn test_overview_name() {
        let body = envelope(json!({ "Symbol": "IBM", "Name": "International Business Machines" }));
        let overview = classify_overview("IBM", body).unwrap();
        assert_eq!(overview.name, "International Business Machines");
        assert_eq!(overview.symbol, "IBM");
    }

    #[test]
    fn test_overview_invalid_symbol() {
        assert_eq!(
            classify_overview("ZZZZ", envelope(json!({}))),
            Err(FetchError::InvalidSymbol)
        );
        assert_eq!(
            classify_overview("ZZZZ", envelope(json!({ "Name": "" }))),
            Err(FetchError::InvalidSymbol)
        );
        assert_eq!(
            classify_overview("ZZZZ", envelope(json!({ "Name": "None" }))),
            Err(FetchError::InvalidSymbol)
        );
        assert_eq!(
            classify_overview("ZZZZ", envelope(json!({ "Name": null }))),
            Err(FetchError::InvalidSymbol)
        );
    }

    #[test]
    fn test_series_parsed_under_kind_key() {
        let body = envelope(json!({
            "Meta Data": { "2. Symbol": "IBM" },
            "Weekly Time Series": {
                "2024-01-05": { "1. open": "99.0", "4. close": "100.25" },
                "2024-01-12": { "1. open": "101.0", "4. close": "103.5" }
            }
        }));
        let series = classify_series(SeriesKind::Weekly, body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(d("2024-01-05")), Some(100.25));
        assert_eq!(series.get(d("2024-01-12")), Some(103.5));
    }

    #[test]
    fn test_series_wrong_key_is_no_data() {
        let body = envelope(json!({
            "Time Series (Daily)": {
                "2024-01-05": { "4. close": "100.0" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }));
        assert!(matches!(
            classify_series(SeriesKind::Monthly, body),
            Err(FetchError::NoData(_))
        ));
    }

    #[test]
    fn test_series_error_message_is_no_data() {
        let body = envelope(json!({
            "Error Message": "Invalid API call. Please retry or visit the documentation."
        }));
        match classify_series(SeriesKind::Daily, body) {
            Err(FetchError::NoData(detail)) => assert!(detail.contains("Invalid API call")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_series_single_entry_is_no_data() {
        let body = envelope(json!({
            "Time Series (Daily)": { "2024-01-05": { "4. close": "100.0" } }
        }));
        assert!(matches!(
            classify_series(SeriesKind::Daily, body),
            Err(FetchError::NoData(_))
        ));
    }

    #[test]
    fn test_series_malformed_entries_are_no_data() {
        let bad_close = envelope(json!({
            "Time Series (Daily)": {
                "2024-01-05": { "4. close": "n/a" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }));
        assert!(matches!(
            classify_series(SeriesKind::Daily, bad_close),
            Err(FetchError::NoData(_))
        ));

        let bad_date = envelope(json!({
            "Time Series (Daily)": {
                "01/05/2024": { "4. close": "100.0" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }));
        assert!(matches!(
            classify_series(SeriesKind::Daily, bad_date),
            Err(FetchError::NoData(_))
        ));

        let missing_close = envelope(json!({
            "Time Series (Daily)": {
                "2024-01-05": { "1. open": "100.0" },
                "2024-01-08": { "4. close": "105.0" }
            }
        }));
        assert!(matches!(
            classify_series(SeriesKind::Daily, missing_close),
            Err(FetchError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn test_series_request_carries_query_parameters() {
        let seen = SeenQueries::default();
        let app = Router::new()
            .route("/query", get(daily_series))
            .with_state(seen.clone());
        let base_url = serve(app).await;

        let series = provider(format!("{}/", base_url))
            .fetch_series("IBM", SeriesKind::Daily, OutputSize::Full)
            .await
            .unwrap();

        assert_eq!(series.get(d("2024-01-08")), Some(105.0));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let params = &seen[0];
        assert_eq!(params.get("function").map(String::as_str), Some("TIME_SERIES_DAILY"));
        assert_eq!(params.get("symbol").map(String::as_str), Some("IBM"));
        assert_eq!(params.get("outputsize").map(String::as_str), Some("full"));
        assert_eq!(params.get("apikey").map(String::as_str), Some("test-key"));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let app = Router::new().route(
            "/query",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base_url = serve(app).await;

        let outcome = provider(base_url).fetch_overview("IBM").await;
        assert!(matches!(outcome, Err(FetchError::Transient(_))), "got {:?}", outcome);
    }

    #[tokio::test]
    async fn test_non_json_body_is_transient() {
        let app = Router::new().route("/query", get(|| async { "<html>maintenance</html>" }));
        let base_url = serve(app).await;

        let outcome = provider(base_url)
            .fetch_series("IBM", SeriesKind::Weekly, OutputSize::Compact)
            .await;
        assert!(matches!(outcome, Err(FetchError::Transient(_))), "got {:?}", outcome);
    }

    #[tokio::test]
    async fn test_closed_port_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = provider(format!("http://{}", addr)).fetch_overview("IBM").await;
        assert!(matches!(outcome, Err(FetchError::Transient(_))), "got {:?}", outcome);
    }
}
