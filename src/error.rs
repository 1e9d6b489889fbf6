//! Error types for the rate limiter.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for rate limiter operations.
#[derive(Error, Debug)]
pub enum RateLimitError {
    /// Configuration-related errors, including a counter script the store
    /// refuses to load
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tracker cannot be turned into a rate-limit key
    #[error("Invalid tracker: {0}")]
    InvalidTracker(String),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Transport(#[source] StoreError),

    /// The store was reached but the counter script failed
    #[error("Counter script failed: {0}")]
    Script(#[source] StoreError),

    /// The counter script replied with a shape it never produces
    #[error("Unexpected counter script reply: {0}")]
    Decode(String),

    /// The caller-supplied deadline elapsed before the store replied
    #[error("Deadline exceeded before the store replied")]
    DeadlineExceeded,
}

impl RateLimitError {
    /// Classify a store failure raised while running the counter script.
    pub(crate) fn from_store(err: StoreError) -> Self {
        if err.is_transport() {
            RateLimitError::Transport(err)
        } else {
            RateLimitError::Script(err)
        }
    }
}

/// Result type alias for rate limiter operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;
