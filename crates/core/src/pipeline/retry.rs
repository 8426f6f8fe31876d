//! Fixed-delay retry for pipeline stages

use std::fmt::Display;
use std::time::Duration;

use tracing::{info, warn};

use super::config::PipelineStage;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Error of the last attempt, with the number of attempts made
#[derive(Debug)]
pub struct AttemptFailure<E> {
    pub error: E,
    pub attempts: u32,
}

/// Retry policy applied uniformly to every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Fixed delay before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Policy that makes a single attempt
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run an operation, retrying retryable failures
    ///
    /// Non-retryable failures return after the attempt that produced them.
    pub fn run<T, E, F>(&self, stage: PipelineStage, mut op: F) -> Result<T, AttemptFailure<E>>
    where
        E: Retryable + Display,
        F: FnMut() -> Result<T, E>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        info!(stage = stage.name(), attempt, "Stage succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    warn!(
                        stage = stage.name(),
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Stage attempt failed, retrying"
                    );
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(error) => {
                    warn!(
                        stage = stage.name(),
                        attempt,
                        retryable = error.is_retryable(),
                        error = %error,
                        "Stage attempt failed, giving up"
                    );
                    return Err(AttemptFailure {
                        error,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}
