use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

/// Doubling delay between attempts, capped, with a bounded attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 3,
        }
    }
}

impl Backoff {
    /// Wait before the attempt following `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds or `backoff.max_attempts` attempts failed,
/// returning the last error in the latter case.
pub async fn retry<T, E, F, Fut>(backoff: &Backoff, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < backoff.max_attempts => {
                let delay = backoff.delay(attempt);
                warn!(operation, attempt, ?delay, "attempt failed, retrying: {err}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
