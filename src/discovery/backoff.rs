//! Randomized exponential backoff for device discovery

use crate::discovery::DiscoveryError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    /// Fraction of the base interval the wait may deviate by, in `[0, 1]`
    pub randomization_factor: f64,
    pub max_interval_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval_ms: 5000,
        }
    }
}

impl BackoffSettings {
    pub fn is_valid(&self) -> bool {
        self.initial_interval_ms > 0
            && self.initial_interval_ms <= self.max_interval_ms
            && self.multiplier >= 1.0
            && (0.0..=1.0).contains(&self.randomization_factor)
    }
}

/// Interval generator; the number of attempts is unbounded
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    settings: BackoffSettings,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(settings: BackoffSettings) -> Self {
        let current = Duration::from_millis(settings.initial_interval_ms);
        Self { settings, current }
    }

    pub fn reset(&mut self) {
        self.current = Duration::from_millis(self.settings.initial_interval_ms);
    }

    /// Base interval the next wait is drawn around
    pub fn current_interval(&self) -> Duration {
        self.current
    }

    fn max_interval(&self) -> Duration {
        Duration::from_millis(self.settings.max_interval_ms)
    }

    /// Draws the next wait and grows the base interval
    pub fn next_backoff(&mut self) -> Duration {
        let base = self.current.as_secs_f64();
        let delta = base * self.settings.randomization_factor;
        let low = base - delta;
        let high = base + delta;

        let wait = if high > low {
            rand::thread_rng().gen_range(low..=high)
        } else {
            base
        };
        let wait = Duration::from_secs_f64(wait.max(0.0)).min(self.max_interval());

        let grown = Duration::from_secs_f64(base * self.settings.multiplier);
        self.current = grown.min(self.max_interval());

        wait
    }
}

/// Runs `operation` until it succeeds, sleeping between attempts
///
/// Only [`DiscoveryError::NoValidDevice`] is retried; any other error is
/// returned immediately. Cancelling `shutdown` ends the wait with
/// [`DiscoveryError::Cancelled`].
pub async fn retry_with_backoff<T, F>(
    backoff: &mut ExponentialBackoff,
    shutdown: &CancellationToken,
    mut operation: F,
) -> Result<T, DiscoveryError>
where
    F: FnMut() -> Result<T, DiscoveryError>,
{
    backoff.reset();
    let mut attempts = 0u64;

    loop {
        if shutdown.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        attempts += 1;
        match operation() {
            Ok(found) => {
                if attempts > 1 {
                    info!("Device found after {} attempts", attempts);
                }
                return Ok(found);
            }
            Err(e) if e.is_retryable() => {
                let wait = backoff.next_backoff();
                if attempts == 1 {
                    warn!("No valid input device, retrying in {:?}", wait);
                } else {
                    debug!("Attempt {} found no device, retrying in {:?}", attempts, wait);
                }

                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => return Err(DiscoveryError::Cancelled),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}
