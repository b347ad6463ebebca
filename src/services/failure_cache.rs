use std::sync::Arc;
use std::time::Duration as StdDuration;
use chrono::{DateTime, Utc, Duration};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Hours an unknown symbol stays known-bad.
const INVALID_SYMBOL_TTL_HOURS: i64 = 24;
/// Hours all provider calls are suppressed after the quota is reported exhausted.
pub const QUOTA_COOLDOWN_HOURS: i64 = 1;

#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub ttl_hours: i64,
}

impl FailureInfo {
    fn new(ttl_hours: i64) -> Self {
        Self {
            failed_at: Utc::now(),
            ttl_hours,
        }
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.failed_at + Duration::hours(self.ttl_hours)
    }

    fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }
}

/// Remembers provider verdicts that would only burn quota if asked again:
/// symbols the provider does not know, and a provider-wide quota cooldown.
#[derive(Clone, Default)]
pub struct FailureCache {
    invalid_symbols: Arc<DashMap<String, FailureInfo>>,
    quota: Arc<Mutex<Option<FailureInfo>>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_invalid_symbol(&self, symbol: &str) -> bool {
        if let Some(entry) = self.invalid_symbols.get(symbol) {
            if entry.value().is_active(Utc::now()) {
                return true;
            }
            drop(entry); // Release the read lock
            self.invalid_symbols.remove(symbol);
        }
        false
    }

    pub fn record_invalid_symbol(&self, symbol: &str) {
        self.invalid_symbols
            .insert(symbol.to_string(), FailureInfo::new(INVALID_SYMBOL_TTL_HOURS));
    }

    /// Clear a symbol (e.g. after a successful overview lookup)
    pub fn clear(&self, symbol: &str) {
        self.invalid_symbols.remove(symbol);
    }

    pub fn record_quota_exhausted(&self) {
        *self.quota.lock() = Some(FailureInfo::new(QUOTA_COOLDOWN_HOURS));
    }

    pub fn quota_exhausted(&self) -> bool {
        let mut quota = self.quota.lock();
        match quota.as_ref() {
            Some(info) if info.is_active(Utc::now()) => true,
            Some(_) => {
                *quota = None;
                false
            }
            None => false,
        }
    }

    /// Time left on the quota cooldown, rounded up to whole seconds.
    pub fn quota_retry_after(&self) -> Option<StdDuration> {
        let now = Utc::now();
        let quota = self.quota.lock();
        let remaining = quota.as_ref()?.expires_at() - now;
        if remaining <= Duration::zero() {
            return None;
        }
        let millis = remaining.num_milliseconds().max(0) as u64;
        Some(StdDuration::from_secs(millis.div_ceil(1000)))
    }

    pub fn len(&self) -> usize {
        self.invalid_symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invalid_symbols.is_empty()
    }
}
