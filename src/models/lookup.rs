use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::external::quote_provider::SeriesKind;

#[derive(Debug, Clone, Deserialize)]
pub struct LookupParams {
    #[serde(default)]
    pub interval: SeriesKind,
}

/// Chart-ready series, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub company_name: String,
    pub symbol: String,
    pub interval: SeriesKind,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}
