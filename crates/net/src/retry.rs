//! Retry policy and backoff calculations

use lobup_config::UploadConfig;
use std::time::Duration;

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `base_delay * 2^n`
    pub base_delay: Duration,
    /// Fraction of the delay added as random jitter (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// Policy used for individual chunk uploads
    #[must_use]
    pub fn for_chunks(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.max_chunk_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            jitter_factor: config.retry_jitter,
        }
    }

    /// Policy used for the block list commit: same growth, no jitter
    #[must_use]
    pub fn for_commit(config: &UploadConfig) -> Self {
        Self {
            max_attempts: config.commit_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            jitter_factor: 0.0,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based)
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.deterministic_delay(attempt);
        if self.jitter_factor <= 0.0 {
            return base;
        }
        let jitter = base.mul_f64(self.jitter_factor * rand::random::<f64>());
        base + jitter
    }

    /// Backoff without jitter
    #[must_use]
    pub fn deterministic_delay(&self, attempt: u32) -> Duration {
        // Attempt counts are small; cap the shift so the multiplier cannot overflow
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::for_chunks(&UploadConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_growth_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            jitter_factor: 0.0,
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(16));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            jitter_factor: 1.0,
        };
        for attempt in 1..5 {
            let base = policy.deterministic_delay(attempt);
            for _ in 0..50 {
                let delay = policy.backoff_delay(attempt);
                assert!(delay >= base);
                assert!(delay <= base * 2);
            }
        }
    }

    #[test]
    fn test_commit_policy_has_no_jitter() {
        let policy = RetryPolicy::for_commit(&UploadConfig::default());
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_delay(3), policy.deterministic_delay(3));
    }
}
