use std::time::Duration;

use suraksha_core::ClientConfig;

use crate::error::UploadError;

/// Exponential backoff for re-running a whole upload flow.
///
/// Only errors that report [`UploadError::is_retryable`] are retried, so
/// validation, credential, permission and size failures surface immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }

    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.upload_max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a failure after `retries_done` retries should be retried.
    pub fn should_retry(&self, retries_done: u32, error: &UploadError) -> bool {
        retries_done < self.max_retries && error.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadStep;
    use suraksha_core::ValidationError;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(1000))
    }

    #[test]
    fn delay_is_exponential_then_capped() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn retries_transient_failures_up_to_limit() {
        let policy = policy();
        let err = UploadError::Request {
            step: UploadStep::StorageUpload,
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(policy.should_retry(0, &err));
        assert!(policy.should_retry(2, &err));
        assert!(!policy.should_retry(3, &err));
    }

    #[test]
    fn never_retries_validation_or_permission() {
        let policy = policy();
        assert!(!policy.should_retry(0, &UploadError::from(ValidationError::EmptyFile)));
        assert!(!policy.should_retry(
            0,
            &UploadError::Request {
                step: UploadStep::SignedUrl,
                status: 403,
                message: "forbidden".to_string(),
            }
        ));
    }

    #[test]
    fn default_policy_does_not_retry() {
        assert_eq!(RetryPolicy::default().max_retries, 0);
        assert_eq!(
            RetryPolicy::from_config(&ClientConfig::default()),
            RetryPolicy::new(0, Duration::from_millis(1000), Duration::from_millis(10_000))
        );
    }
}
