//! Core rate limiter implementation.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::key::TrackerKey;
use super::policy::Policy;
use super::script::{CounterScript, ScriptOutcome};
use crate::error::{RateLimitError, Result};
use crate::store::{ScriptReply, ScriptStore};

/// A fixed-window rate limiter whose counters live in a shared store.
///
/// The limiter holds no counters and no locks of its own. Every call to
/// [`RateLimiter::allow`] is one round trip running the counter script, and
/// the store executing that script atomically is what keeps concurrent
/// callers (in this process or any other sharing the store) from losing or
/// double-counting hits.
pub struct RateLimiter<S: ScriptStore> {
    /// Store holding the counters
    store: S,
    /// The counter script, prepared for `store`
    script: CounterScript<S::Script>,
    /// Hits allowed per window
    policy: Policy,
}

impl<S: ScriptStore> RateLimiter<S> {
    /// Create a rate limiter allowing `max_allowed_hits` hits per tracker every
    /// `window_seconds`.
    ///
    /// This does not contact the store; connection problems surface on the
    /// first call to [`RateLimiter::allow`].
    pub fn new(store: S, max_allowed_hits: u64, window_seconds: u64) -> Result<Self> {
        Self::with_policy(store, Policy::new(max_allowed_hits, window_seconds)?)
    }

    /// Create a rate limiter from an already validated policy.
    pub fn with_policy(store: S, policy: Policy) -> Result<Self> {
        let script = CounterScript::load(&store, &policy)?;

        debug!(
            max_allowed_hits = policy.max_allowed_hits(),
            window_seconds = policy.window_seconds(),
            "Rate limiter initialized"
        );

        Ok(Self {
            store,
            script,
            policy,
        })
    }

    /// Count a hit for `tracker` and decide whether it is allowed.
    ///
    /// Returns `Ok(true)` while the tracker is within its limit for the
    /// current window and `Ok(false)` once it has exceeded it. Any error means
    /// the decision is unknown; whether to let the request through is up to
    /// the caller.
    ///
    /// Dropping the returned future abandons the call. The script either ran
    /// in full on the store or not at all, so no partial count is left behind.
    pub async fn allow(&self, tracker: &str) -> Result<bool> {
        let key = TrackerKey::new(tracker)?;

        trace!(key = %key, "Checking rate limit");

        let reply = self
            .script
            .run(&self.store, &key)
            .await
            .map_err(RateLimitError::from_store)?;

        match reply {
            ScriptReply::Value(value) => {
                let outcome = ScriptOutcome::decode(&value)?;
                if !outcome.is_allowed() {
                    debug!(
                        key = %key,
                        limit = self.policy.max_allowed_hits(),
                        "Rate limit exceeded"
                    );
                }
                Ok(outcome.is_allowed())
            }
            ScriptReply::Absent => {
                // The counter script always replies with an integer.
                warn!(key = %key, "Counter script returned no value, allowing request");
                Ok(true)
            }
        }
    }

    /// Like [`RateLimiter::allow`], giving up once `deadline` passes.
    pub async fn allow_until(&self, tracker: &str, deadline: Instant) -> Result<bool> {
        tokio::time::timeout_at(deadline, self.allow(tracker))
            .await
            .map_err(|_| RateLimitError::DeadlineExceeded)?
    }

    /// Like [`RateLimiter::allow`], giving up after `timeout`.
    pub async fn allow_within(&self, tracker: &str, timeout: Duration) -> Result<bool> {
        self.allow_until(tracker, Instant::now() + timeout).await
    }

    /// Get the policy this limiter enforces.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Get the store key holding the counter for `tracker`.
    pub fn tracker_key(&self, tracker: &str) -> Result<TrackerKey> {
        TrackerKey::new(tracker)
    }

    /// Get the store this limiter counts in.
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ScriptStore + std::fmt::Debug> std::fmt::Debug for RateLimiter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .finish()
    }
}
