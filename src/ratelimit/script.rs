//! The atomic counter script.
//!
//! All of the check-then-act logic of the limiter lives in one Lua script
//! that the store runs as a single indivisible operation:
//!
//! 1. `INCR` the tracker's counter (an absent or expired key counts as 0).
//! 2. If the counter was just created, `EXPIRE` it after the window. An
//!    existing counter keeps its TTL, so the window stays anchored to the
//!    first hit.
//! 3. Reply `0` while the count is within the limit, `1` once it exceeds it.
//!
//! The script never reads a clock; window rollover is the store's own TTL
//! eviction.

use super::key::TrackerKey;
use super::policy::Policy;
use crate::error::{RateLimitError, Result};
use crate::store::{Reply, ScriptReply, ScriptStore, StoreError};

/// Lua source of the counter script.
pub const COUNTER_SCRIPT: &str = include_str!("counter.lua");

/// What the counter script decided for one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// The count is within the limit.
    Allowed,
    /// The count exceeds the limit.
    Breached,
}

impl ScriptOutcome {
    /// Decode a script reply.
    ///
    /// The script only ever replies with an integer; any other shape means the
    /// script and this client disagree about its contract.
    pub fn decode(reply: &Reply) -> Result<Self> {
        match reply {
            Reply::Integer(0) => Ok(ScriptOutcome::Allowed),
            Reply::Integer(_) => Ok(ScriptOutcome::Breached),
            other => Err(RateLimitError::Decode(format!(
                "expected an integer, got {}: {:?}",
                other.kind(),
                other
            ))),
        }
    }

    /// Whether the hit is within the limit.
    pub fn is_allowed(&self) -> bool {
        matches!(self, ScriptOutcome::Allowed)
    }
}

/// The counter script prepared against a store, bound to a policy.
pub struct CounterScript<H> {
    handle: H,
    args: [String; 2],
}

impl<H> CounterScript<H> {
    /// Prepare the counter script for `store`.
    ///
    /// Fails with a configuration error if the store cannot load the script.
    pub fn load<S>(store: &S, policy: &Policy) -> Result<Self>
    where
        S: ScriptStore<Script = H>,
    {
        let handle = store.prepare(COUNTER_SCRIPT).map_err(|e| {
            RateLimitError::Config(format!("Failed to load counter script: {}", e))
        })?;

        Ok(Self {
            handle,
            args: [
                policy.max_allowed_hits().to_string(),
                policy.window_seconds().to_string(),
            ],
        })
    }

    /// Count one hit against `key` in a single round trip.
    pub async fn run<S>(
        &self,
        store: &S,
        key: &TrackerKey,
    ) -> std::result::Result<ScriptReply, StoreError>
    where
        S: ScriptStore<Script = H>,
    {
        let keys = [key.as_str().to_string()];
        store.eval(&self.handle, &keys, &self.args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_decode_zero_is_allowed() {
        assert_eq!(
            ScriptOutcome::decode(&Reply::Integer(0)).unwrap(),
            ScriptOutcome::Allowed
        );
    }

    #[test]
    fn test_decode_nonzero_is_breached() {
        assert_eq!(
            ScriptOutcome::decode(&Reply::Integer(1)).unwrap(),
            ScriptOutcome::Breached
        );
        assert!(!ScriptOutcome::decode(&Reply::Integer(7)).unwrap().is_allowed());
    }

    #[test]
    fn test_decode_rejects_non_integers() {
        let err = ScriptOutcome::decode(&Reply::Data(b"0".to_vec())).unwrap_err();
        assert!(matches!(err, RateLimitError::Decode(_)));

        let err = ScriptOutcome::decode(&Reply::Status("OK".to_string())).unwrap_err();
        assert!(matches!(err, RateLimitError::Decode(_)));
    }

    #[test]
    fn test_script_uses_incr_and_expire() {
        assert!(COUNTER_SCRIPT.contains("INCR"));
        assert!(COUNTER_SCRIPT.contains("EXPIRE"));
        assert!(!COUNTER_SCRIPT.contains("TIME"));
    }

    #[tokio::test]
    async fn test_run_passes_policy_as_arguments() {
        let store = MemoryStore::new();
        let policy = Policy::new(1, 30).unwrap();
        let script = CounterScript::load(&store, &policy).unwrap();
        let key = TrackerKey::new("alice").unwrap();

        assert_eq!(script.args, ["1".to_string(), "30".to_string()]);

        let first = script.run(&store, &key).await.unwrap();
        let second = script.run(&store, &key).await.unwrap();
        assert_eq!(first, ScriptReply::Value(Reply::Integer(0)));
        assert_eq!(second, ScriptReply::Value(Reply::Integer(1)));

        let (hits, ttl) = store.counter(key.as_str()).unwrap();
        assert_eq!(hits, 2);
        assert!(ttl <= policy.window());
    }
}
