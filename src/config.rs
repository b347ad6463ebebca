use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::MAX_WATCHLIST_ENTRIES;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    /// Hard limit for a single provider call.
    pub timeout: Duration,
    /// Free tier allows 5 calls per minute.
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Overall budget for one inbound HTTP request, refresh pass included.
    pub request_budget: Duration,
    pub alphavantage: AlphaVantageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let config = Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            request_budget: Duration::from_secs(parse_or(&lookup, "REQUEST_BUDGET_SECS", 120)?),
            alphavantage: AlphaVantageConfig {
                api_key: required("ALPHAVANTAGE_API_KEY")?,
                base_url: lookup("ALPHAVANTAGE_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(parse_or(&lookup, "PROVIDER_TIMEOUT_SECS", 10)?),
                requests_per_minute: parse_or(&lookup, "PROVIDER_REQUESTS_PER_MINUTE", 5)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.alphavantage.requests_per_minute == 0 {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_REQUESTS_PER_MINUTE",
                value: "0".to_string(),
            });
        }
        if self.alphavantage.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        if self.request_budget < self.full_refresh_duration() {
            return Err(ConfigError::Invalid {
                name: "REQUEST_BUDGET_SECS",
                value: self.request_budget.as_secs().to_string(),
            });
        }
        Ok(())
    }

    /// Worst case for one user's refresh pass on an idle limiter: every entry
    /// waits out the call spacing, and the last call may run to its timeout.
    pub fn full_refresh_duration(&self) -> Duration {
        let spacing = Duration::from_secs(60) / self.alphavantage.requests_per_minute;
        spacing * MAX_WATCHLIST_ENTRIES as u32 + self.alphavantage.timeout
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}
