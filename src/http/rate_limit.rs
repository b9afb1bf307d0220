//! Minimum-interval rate limiter for outbound requests.

use crate::error::CrawlError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;

/// Enforces a maximum number of granted calls per second.
///
/// Callers sharing one instance serialize on the last-grant timestamp, so the
/// spacing between any two granted calls is at least `1 / max_calls_per_second`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_granted: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_calls_per_second` calls.
    pub fn new(max_calls_per_second: f64) -> Result<Self, CrawlError> {
        if !max_calls_per_second.is_finite() || max_calls_per_second <= 0.0 {
            return Err(CrawlError::InvalidConfiguration(format!(
                "max_calls_per_second must be positive, got {}",
                max_calls_per_second
            )));
        }

        // A tiny rate gives an interval no Duration or Instant can hold.
        let min_interval = Duration::try_from_secs_f64(1.0 / max_calls_per_second)
            .ok()
            .filter(|interval| Instant::now().checked_add(*interval).is_some())
            .ok_or_else(|| {
                CrawlError::InvalidConfiguration(format!(
                    "max_calls_per_second is too small, got {}",
                    max_calls_per_second
                ))
            })?;

        Ok(Self { min_interval, last_granted: Mutex::new(None) })
    }

    /// Returns the minimum spacing between granted calls.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until another call is allowed and returns the instant it was granted.
    pub async fn wait(&self) -> Instant {
        // The lock is held across the sleep so concurrent callers queue up.
        let mut last = self.last_granted.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                let wait = ready_at - now;
                trace!("Rate limiter sleeping {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        let granted = Instant::now();
        *last = Some(granted);
        granted
    }
}
