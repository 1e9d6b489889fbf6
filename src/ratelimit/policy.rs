//! Fixed-window rate limit policy.

use std::time::Duration;

use crate::error::{RateLimitError, Result};

/// Largest value either policy field may take; store integers are signed
/// 64-bit.
pub const MAX_POLICY_VALUE: u64 = i64::MAX as u64;

/// How many hits a tracker may make per window.
///
/// A policy is validated once at construction and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Policy {
    max_allowed_hits: u64,
    window_seconds: u64,
}

impl Policy {
    /// Create a policy allowing `max_allowed_hits` hits every `window_seconds`.
    ///
    /// Both values must be between 1 and [`MAX_POLICY_VALUE`].
    pub fn new(max_allowed_hits: u64, window_seconds: u64) -> Result<Self> {
        if max_allowed_hits == 0 {
            return Err(RateLimitError::Config(
                "max allowed hits must be at least 1".to_string(),
            ));
        }
        if window_seconds == 0 {
            return Err(RateLimitError::Config(
                "window must be at least 1 second".to_string(),
            ));
        }

        if max_allowed_hits > MAX_POLICY_VALUE {
            return Err(RateLimitError::Config(format!(
                "max allowed hits must be at most {}",
                MAX_POLICY_VALUE
            )));
        }
        if window_seconds > MAX_POLICY_VALUE {
            return Err(RateLimitError::Config(format!(
                "window must be at most {} seconds",
                MAX_POLICY_VALUE
            )));
        }

        Ok(Self {
            max_allowed_hits,
            window_seconds,
        })
    }

    /// Get the number of hits allowed per window.
    pub fn max_allowed_hits(&self) -> u64 {
        self.max_allowed_hits
    }

    /// Get the window length in seconds.
    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Get the window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accessors() {
        let policy = Policy::new(5, 10).unwrap();
        assert_eq!(policy.max_allowed_hits(), 5);
        assert_eq!(policy.window_seconds(), 10);
        assert_eq!(policy.window(), Duration::from_secs(10));
    }

    #[test]
    fn test_policy_rejects_zero_hits() {
        assert!(matches!(Policy::new(0, 10), Err(RateLimitError::Config(_))));
    }

    #[test]
    fn test_policy_rejects_zero_window() {
        assert!(matches!(Policy::new(5, 0), Err(RateLimitError::Config(_))));
    }

    #[test]
    fn test_policy_rejects_values_beyond_signed_range() {
        assert!(matches!(
            Policy::new(u64::MAX, 10),
            Err(RateLimitError::Config(_))
        ));
        assert!(matches!(
            Policy::new(5, MAX_POLICY_VALUE + 1),
            Err(RateLimitError::Config(_))
        ));
        assert!(Policy::new(MAX_POLICY_VALUE, MAX_POLICY_VALUE).is_ok());
    }

    #[test]
    fn test_single_hit_single_second_is_valid() {
        assert!(Policy::new(1, 1).is_ok());
    }
}
