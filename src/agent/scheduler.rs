use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-interval polling scheduler with optional jitter
pub struct PollingScheduler {
    base_interval: Duration,
    jitter_range: Duration,
}

impl PollingScheduler {
    /// Create a new polling scheduler
    ///
    /// # Arguments
    /// * `interval_secs` - Base polling interval in seconds
    /// * `jitter_secs` - Maximum random delay added to each interval, in seconds
    pub fn new(interval_secs: u64, jitter_secs: u64) -> Self {
        Self {
            base_interval: Duration::from_secs(interval_secs),
            jitter_range: Duration::from_secs(jitter_secs),
        }
    }

    pub fn interval(&self) -> Duration {
        self.base_interval
    }

    /// Sleep until the next poll is due
    pub async fn sleep_until_next_poll(&self) {
        let sleep_duration = self.calculate_next_interval();
        tracing::debug!(
            "Sleeping for {} seconds until next poll",
            sleep_duration.as_secs()
        );
        sleep(sleep_duration).await;
    }

    /// Estimated time of the poll after `last`, `None` if it is out of range
    pub fn next_poll_after(&self, last: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.base_interval.as_secs()).ok()?;
        last.checked_add_signed(chrono::Duration::try_seconds(secs)?)
    }

    /// Calculate the next sleep interval with jitter
    fn calculate_next_interval(&self) -> Duration {
        self.base_interval + self.random_jitter()
    }

    /// Random jitter in [0, jitter_range]
    fn random_jitter(&self) -> Duration {
        let max = self.jitter_range.as_secs();
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs(rand::thread_rng().gen_range(0..=max))
    }
}
