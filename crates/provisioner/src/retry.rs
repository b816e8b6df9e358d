//! Exponential backoff for idempotent reads

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff schedule; the default matches client-go's `DefaultBackoff`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Total attempts, including the first
    pub steps: u32,
    pub initial: Duration,
    pub factor: f64,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            steps: 4,
            initial: Duration::from_millis(10),
            factor: 5.0,
            cap: Duration::from_secs(10),
        }
    }
}

impl Backoff {
    /// Delay before retry number `retry` (0-based)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let scaled = self.initial.as_nanos() as f64 * self.factor.powi(exp);
        if scaled.is_finite() && scaled < self.cap.as_nanos() as f64 {
            Duration::from_nanos(scaled as u64)
        } else {
            self.cap
        }
    }
}

/// Run `op` until it succeeds, returns a non-retriable error, or the
/// schedule runs out. The last error is returned.
pub async fn retry_on_error<T, E, F, Fut, R>(backoff: Backoff, retriable: R, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let attempts = backoff.steps.max(1);
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retry + 1 < attempts && retriable(&err) => {
                let delay = backoff.delay(retry);
                warn!(
                    error = %err,
                    attempt = retry + 1,
                    max_attempts = attempts,
                    "retrying in {delay:?}"
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
