//! Rate-limit key derivation.

use crate::error::{RateLimitError, Result};

/// Namespace shared by every rate-limit key.
///
/// Existing deployments already hold counters under this prefix, so it must
/// not change.
pub const KEY_PREFIX: &str = "go-rate-limit-redis";

/// The store key holding the counter of one tracker.
///
/// Format: `{KEY_PREFIX}:tracker:{tracker}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerKey(String);

impl TrackerKey {
    /// Derive the key for a tracker.
    ///
    /// The tracker is opaque; it only has to be non-empty.
    pub fn new(tracker: &str) -> Result<Self> {
        if tracker.is_empty() {
            return Err(RateLimitError::InvalidTracker(
                "tracker must not be empty".to_string(),
            ));
        }
        Ok(Self(format!("{}:tracker:{}", KEY_PREFIX, tracker)))
    }

    /// Get the tracker this key was derived from.
    pub fn tracker(&self) -> &str {
        &self.0[KEY_PREFIX.len() + ":tracker:".len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_key_format() {
        let key = TrackerKey::new("192.168.1.0").unwrap();
        assert_eq!(key.as_str(), "go-rate-limit-redis:tracker:192.168.1.0");
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn test_tracker_round_trip_with_separators() {
        let key = TrackerKey::new("user:42:tracker:x").unwrap();
        assert_eq!(key.tracker(), "user:42:tracker:x");
    }

    #[test]
    fn test_empty_tracker_is_rejected() {
        assert!(matches!(
            TrackerKey::new(""),
            Err(RateLimitError::InvalidTracker(_))
        ));
    }

    #[test]
    fn test_tracker_key_equality() {
        assert_eq!(TrackerKey::new("a").unwrap(), TrackerKey::new("a").unwrap());
        assert_ne!(TrackerKey::new("a").unwrap(), TrackerKey::new("b").unwrap());
    }
}
