//! Backoff for card store requests.
//!
//! A request is only repeated when its method is idempotent and the failure
//! is transient. Creates therefore always get exactly one attempt.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

use crate::errors::BookwatchResult;
use crate::transport::HttpMethod;

/// Backoff settings for repeated requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Repeats allowed after the first attempt.
    pub max_retries: u32,
    /// Wait before the first repeat. Doubles for each later one.
    pub initial_delay: Duration,
    /// Upper bound on the wait, before jitter.
    pub max_delay: Duration,
    /// Stretch each wait by up to a quarter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of repeats.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the first wait.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the wait cap.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// A configuration that never repeats a request.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Wait before repeat number `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self.initial_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            let stretch = rand::thread_rng().gen_range(0.0..0.25);
            delay.saturating_add(delay.mul_f64(stretch))
        } else {
            delay
        }
    }
}

/// Repeats idempotent card store requests on transient failures.
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from its configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Repeats allowed for a request with this method.
    pub fn retries_for(&self, method: HttpMethod) -> u32 {
        if method.is_idempotent() {
            self.config.max_retries
        } else {
            0
        }
    }

    /// Runs `attempt` until it succeeds, fails with an error that is not
    /// retryable, or the repeats allowed for `method` are used up.
    #[instrument(skip(self, attempt))]
    pub async fn run<F, Fut, T>(&self, method: HttpMethod, attempt: F) -> BookwatchResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = BookwatchResult<T>>,
    {
        let allowed = self.retries_for(method);
        let mut retries = 0;

        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retries >= allowed || !err.is_retryable() {
                return Err(err);
            }

            let delay = self.config.backoff(retries);
            retries += 1;
            tracing::info!(retry = retries, allowed, ?delay, error = %err, "Repeating request");
            tokio::time::sleep(delay).await;
        }
    }
}
