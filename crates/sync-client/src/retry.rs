//! Retry policy with fixed or exponential backoff.

use std::time::Duration;

use rand::Rng;

use crate::error::Error;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff strategy to use.
    pub backoff: BackoffStrategy,
    /// Whether HTTP 429 responses are retried at all.
    pub retry_rate_limits: bool,
    /// Whether to respect Retry-After headers.
    pub respect_retry_after: bool,
    /// Maximum time to wait from Retry-After header.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::Constant,
            retry_rate_limits: true,
            respect_retry_after: false,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the max delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Honor the server's Retry-After header, capped at `max_retry_after`.
    pub fn with_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    /// Surface HTTP 429 to the caller instead of retrying it.
    pub fn without_rate_limit_retry(mut self) -> Self {
        self.retry_rate_limits = false;
        self
    }

    /// Disable retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Returns true if `err` should be retried under this configuration.
    pub fn retries(&self, err: &Error) -> bool {
        if err.is_rate_limited() {
            return self.retry_rate_limits;
        }
        err.is_retryable()
    }
}

/// Backoff strategy for determining retry delays.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant,
    /// Linear increase in delay (delay * attempt).
    Linear,
    /// Exponential increase in delay (delay * factor^attempt).
    Exponential { factor: f64 },
    /// Exponential with random jitter to avoid thundering herd.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let delay = match self {
            BackoffStrategy::Constant => initial_delay,
            BackoffStrategy::Linear => initial_delay * (attempt + 1),
            BackoffStrategy::Exponential { factor } => {
                let multiplier = factor.powi(attempt as i32);
                Duration::from_secs_f64(initial_delay.as_secs_f64() * multiplier)
            }
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base_multiplier = factor.powi(attempt as i32);
                let base_delay = initial_delay.as_secs_f64() * base_multiplier;

                // Jitter: random value between 0 and base_delay
                let jitter = rand::rng().random::<f64>() * base_delay;

                Duration::from_secs_f64(base_delay + jitter)
            }
        };

        std::cmp::min(delay, max_delay)
    }
}

/// Per-request retry state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    /// Create a new retry policy from config.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the number of retries taken so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns true if another retry is allowed.
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Returns true if `err` is eligible for a retry under this policy's config.
    pub fn retries(&self, err: &Error) -> bool {
        self.config.retries(err)
    }

    /// Record an attempt and return the delay before the next retry.
    /// Returns None if we've exhausted all retries.
    ///
    /// Every call consumes one slot, rate-limited or not.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        let delay = match retry_after {
            Some(retry_after) if self.config.respect_retry_after => {
                std::cmp::min(retry_after, self.config.max_retry_after)
            }
            _ => self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            ),
        };

        self.attempt += 1;
        Some(delay)
    }

    /// Reset the retry policy for a new request.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert!(matches!(config.backoff, BackoffStrategy::Constant));
        assert!(config.retry_rate_limits);
        assert!(!config.respect_retry_after);
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::new(RetryConfig::no_retry());
        assert!(!policy.should_retry());
    }

    #[test]
    fn test_constant_backoff() {
        let delay =
            BackoffStrategy::Constant.delay(0, Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(delay, Duration::from_secs(1));

        let delay =
            BackoffStrategy::Constant.delay(4, Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff() {
        let strategy = BackoffStrategy::Exponential { factor: 2.0 };
        let initial = Duration::from_secs(1);
        let max = Duration::from_secs(60);

        assert_eq!(strategy.delay(0, initial, max), Duration::from_secs(1));
        assert_eq!(strategy.delay(1, initial, max), Duration::from_secs(2));
        assert_eq!(strategy.delay(3, initial, max), Duration::from_secs(8));
        assert_eq!(strategy.delay(10, initial, max), Duration::from_secs(60));
    }

    #[test]
    fn test_exponential_with_jitter() {
        let strategy = BackoffStrategy::ExponentialWithJitter { factor: 2.0 };
        let initial = Duration::from_secs(1);
        let max = Duration::from_secs(60);

        let delay = strategy.delay(1, initial, max);
        assert!(delay >= Duration::from_secs(2));
        assert!(delay <= Duration::from_secs(4));
    }

    #[test]
    fn test_retry_policy_exhausts() {
        let mut policy = RetryPolicy::new(RetryConfig::default().with_max_attempts(2));

        assert_eq!(policy.next_delay(None), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_delay(None), Some(Duration::from_secs(1)));
        assert_eq!(policy.attempt(), 2);
        assert!(policy.next_delay(None).is_none());

        policy.reset();
        assert!(policy.should_retry());
    }

    #[test]
    fn test_retry_after_ignored_by_default() {
        let mut policy = RetryPolicy::new(RetryConfig::default());
        let delay = policy.next_delay(Some(Duration::from_secs(30))).unwrap();
        assert_eq!(delay, Duration::from_secs(1));
    }

    #[test]
    fn test_retry_after_respected_and_capped() {
        let mut policy = RetryPolicy::new(RetryConfig::default().with_retry_after(true));
        let delay = policy.next_delay(Some(Duration::from_secs(30))).unwrap();
        assert_eq!(delay, Duration::from_secs(30));

        let delay = policy.next_delay(Some(Duration::from_secs(600))).unwrap();
        assert_eq!(delay, Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limit_retry_can_be_disabled() {
        let rate_limited = Error::new(ErrorKind::RateLimited { retry_after: None });
        let server_error = Error::new(ErrorKind::Http {
            status: 502,
            message: "bad gateway".into(),
        });

        let config = RetryConfig::default().without_rate_limit_retry();
        assert!(!config.retries(&rate_limited));
        assert!(config.retries(&server_error));

        assert!(RetryConfig::default().retries(&rate_limited));
    }
}
