//! Bounded retry with exponential backoff for status delivery.

use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds or retries are exhausted.
    ///
    /// Returns the last error together with the number of attempts made.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, (E, u32)>
    where
        F: FnMut(u32) -> Result<T, E>,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt <= self.max_retries => {
                    let delay = self.delay_for_retry(attempt);
                    log::debug!(
                        "status delivery attempt {} failed: {}; retrying in {:?}",
                        attempt,
                        err,
                        delay
                    );
                    std::thread::sleep(delay);
                }
                Err(err) => return Err((err, attempt)),
            }
        }
    }
}
