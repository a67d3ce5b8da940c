//! Fixed-count, fixed-delay retry loop.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Errors that say whether repeating the operation could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Same policy with a different attempt budget.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(max_attempts, self.delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub fn run<T, E, F>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    warn!("{label}: {e} (not retrying)");
                    return Err(e);
                }
                Err(e) => {
                    error!("{label}: attempt {attempt}/{max} failed: {e}");
                    if attempt >= max {
                        error!("{label}: all {max} attempts failed");
                        return Err(e);
                    }
                    if !self.delay.is_zero() {
                        info!("Waiting {}s before retry...", self.delay.as_secs_f32());
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
