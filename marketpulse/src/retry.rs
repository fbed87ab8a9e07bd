//! Exponential backoff policy for agent retries.
//!
//! Retries are driven entirely by the coordinator; agents never retry
//! themselves. The delay doubles with each attempt, is capped at a
//! configurable ceiling, and may be jittered to avoid synchronized
//! retry bursts across agents sharing a dependency.

use crate::config::PipelineConfig;
use rand::Rng;
use std::time::Duration;

/// Backoff policy applied between retry attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay in milliseconds, doubled each attempt.
    pub base_delay_ms: u64,
    /// Delay ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Whether to apply full jitter (random in `0..=delay`).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a policy from the pipeline configuration.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.retry_jitter,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay ceiling.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Enables or disables jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// The delay to wait after the given zero-indexed failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped = doubled.min(self.max_delay_ms);

        let delayed = if self.jitter && capped > 0 {
            rand::thread_rng().gen_range(0..=capped)
        } else {
            capped
        };
        Duration::from_millis(delayed)
    }

    /// Worst-case total delay across `max_retries` retries.
    ///
    /// Useful when budgeting stage latency: total stage time is bounded
    /// by `attempts * timeout + max_total_delay`.
    #[must_use]
    pub fn max_total_delay(&self, max_retries: u32) -> Duration {
        let total: u64 = (0..max_retries)
            .map(|attempt| {
                self.base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt))
                    .min(self.max_delay_ms)
            })
            .sum();
        Duration::from_millis(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delay_doubles_without_jitter() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_max_delay_ms(10_000)
            .with_jitter(false);

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn test_delay_capped_at_ceiling() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(1000)
            .with_max_delay_ms(5000)
            .with_jitter(false);

        assert_eq!(policy.delay_for(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_max_delay_ms(10_000)
            .with_jitter(true);

        for _ in 0..20 {
            assert!(policy.delay_for(1) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_max_total_delay() {
        let policy = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_max_delay_ms(250)
            .with_jitter(false);

        // 100 + 200 + 250 (capped)
        assert_eq!(policy.max_total_delay(3), Duration::from_millis(550));
        assert_eq!(policy.max_total_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_from_config() {
        let config = PipelineConfig::new()
            .with_base_delay_ms(10)
            .with_max_delay_ms(40)
            .with_retry_jitter(false);
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.base_delay_ms, 10);
        assert_eq!(policy.max_delay_ms, 40);
        assert!(!policy.jitter);
    }
}
