use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{sleep, Duration, Instant};

/// Serialises market-data calls and spaces them out.
///
/// Every provider call waits for the previous one to finish and for
/// `min_delay` to pass since it started.
pub struct RateLimiter {
    /// Start time of the most recent call; holding the lock is holding the slot.
    last_request: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// # Arguments
    /// * `requests_per_minute` - Maximum requests per minute (5 for the Alpha Vantage free tier)
    pub fn new(requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / u64::from(requests_per_minute.max(1));
        Self {
            last_request: Mutex::new(None),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Waits for the single call slot and the minimum spacing.
    ///
    /// The slot is released when the returned guard is dropped.
    pub async fn acquire(&self) -> RateLimitGuard<'_> {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                sleep(self.min_delay - elapsed).await;
            }
        }

        *last = Some(Instant::now());

        RateLimitGuard { _slot: last }
    }
}

pub struct RateLimitGuard<'a> {
    _slot: MutexGuard<'a, Option<Instant>>,
}
