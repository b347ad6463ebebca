use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which historical series to request from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    #[default]
    #[serde(rename = "TIME_SERIES_DAILY", alias = "daily")]
    Daily,
    #[serde(rename = "TIME_SERIES_WEEKLY", alias = "weekly")]
    Weekly,
    #[serde(rename = "TIME_SERIES_MONTHLY", alias = "monthly")]
    Monthly,
}

impl SeriesKind {
    /// Value of the `function` query parameter.
    pub fn function(&self) -> &'static str {
        match self {
            SeriesKind::Daily => "TIME_SERIES_DAILY",
            SeriesKind::Weekly => "TIME_SERIES_WEEKLY",
            SeriesKind::Monthly => "TIME_SERIES_MONTHLY",
        }
    }

    /// Top-level key the series is delivered under.
    pub fn series_key(&self) -> &'static str {
        match self {
            SeriesKind::Daily => "Time Series (Daily)",
            SeriesKind::Weekly => "Weekly Time Series",
            SeriesKind::Monthly => "Monthly Time Series",
        }
    }
}

/// Compact windows cover roughly the last 100 trading days, so anything that
/// needs a year-ago close must ask for `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    Compact,
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// Closing prices keyed by trading day. Weekends and holidays are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    closes: BTreeMap<NaiveDate, f64>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, close: f64) {
        self.closes.insert(date, close);
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.closes.get(&date).copied()
    }

    pub fn earliest(&self) -> Option<(NaiveDate, f64)> {
        self.closes.iter().next().map(|(d, c)| (*d, *c))
    }

    /// Entries newest first.
    pub fn iter_desc(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.closes.iter().rev().map(|(d, c)| (*d, *c))
    }

    /// Entries oldest first.
    pub fn iter_asc(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.closes.iter().map(|(d, c)| (*d, *c))
    }

    /// Latest entry dated on or before `date`.
    pub fn on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.closes.range(..=date).next_back().map(|(d, c)| (*d, *c))
    }
}

impl FromIterator<(NaiveDate, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self {
            closes: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("provider quota exhausted")]
    RateLimited,

    #[error("unknown symbol")]
    InvalidSymbol,

    #[error("no usable data: {0}")]
    NoData(String),

    #[error("transient provider error: {0}")]
    Transient(String),
}

/// Result of one provider call, already classified.
pub type FetchOutcome<T> = Result<T, FetchError>;

/// A market-data source. Implementations perform exactly one outbound call per
/// method invocation and never retry.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_series(
        &self,
        symbol: &str,
        kind: SeriesKind,
        size: OutputSize,
    ) -> FetchOutcome<TimeSeries>;

    async fn fetch_overview(&self, symbol: &str) -> FetchOutcome<CompanyOverview>;
}
