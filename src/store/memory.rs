//! In-process script store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

use super::{Reply, ScriptReply, ScriptStore, StoreError};
use crate::ratelimit::COUNTER_SCRIPT;

/// Number of script runs between sweeps of expired counters.
const SWEEP_INTERVAL: u64 = 1024;

/// A counter held by the in-process store.
#[derive(Debug, Clone, Copy)]
struct Counter {
    hits: i64,
    expires_at: Instant,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        self.hits > 0 && self.expires_at > now
    }
}

/// The counter script, prepared for a [`MemoryStore`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryScript;

/// A [`ScriptStore`] that keeps counters in process memory.
///
/// It runs the counter script natively instead of interpreting Lua, under the
/// per-key lock of a [`DashMap`] entry, so concurrent callers observe the same
/// atomicity Redis gives. Expiry is measured with [`tokio::time::Instant`] and
/// therefore follows `tokio::time::pause` and `advance` in tests.
///
/// Expired counters are dropped every [`SWEEP_INTERVAL`] script runs, or on
/// demand with [`MemoryStore::purge_expired`].
///
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    counters: Arc<DashMap<String, Counter>>,
    online: Arc<AtomicBool>,
    evals: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            online: Arc::new(AtomicBool::new(true)),
            evals: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Get the hit count and remaining time to live of a key.
    ///
    /// Returns `None` if the key is absent or expired.
    pub fn counter(&self, key: &str) -> Option<(i64, Duration)> {
        let now = Instant::now();
        self.counters
            .get(key)
            .filter(|c| c.is_live(now))
            .map(|c| (c.hits, c.expires_at - now))
    }

    /// Get the number of live counters.
    pub fn counter_count(&self) -> usize {
        let now = Instant::now();
        self.counters.iter().filter(|c| c.is_live(now)).count()
    }

    /// Drop every counter whose window has ended.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.counters.retain(|_, c| c.is_live(now));
    }

    fn increment(
        &self,
        key: &str,
        max_allowed_hits: i64,
        window: Duration,
    ) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            hits: 0,
            expires_at: now,
        });

        if !counter.is_live(now) {
            // The window must be valid before the first hit is recorded.
            counter.expires_at = now.checked_add(window).ok_or_else(|| {
                StoreError::Script(format!("invalid expire time: {}", window.as_secs()))
            })?;
            counter.hits = 0;
        }
        counter.hits += 1;

        trace!(key = %key, hits = counter.hits, "Incremented in-memory counter");

        Ok(if counter.hits > max_allowed_hits { 1 } else { 0 })
    }

    fn maybe_sweep(&self) {
        let evals = self.evals.fetch_add(1, Ordering::Relaxed) + 1;
        if evals % SWEEP_INTERVAL == 0 {
            self.purge_expired();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_arg(args: &[String], index: usize, name: &str) -> Result<i64, StoreError> {
    let raw = args
        .get(index)
        .ok_or_else(|| StoreError::Script(format!("missing argument {}", name)))?;
    raw.parse()
        .map_err(|_| StoreError::Script(format!("{} is not an integer: {:?}", name, raw)))
}

#[async_trait]
impl ScriptStore for MemoryStore {
    type Script = MemoryScript;

    fn prepare(&self, source: &str) -> Result<MemoryScript, StoreError> {
        if source.trim() == COUNTER_SCRIPT.trim() {
            Ok(MemoryScript)
        } else {
            Err(StoreError::Unsupported(
                "the in-memory store only runs the counter script".to_string(),
            ))
        }
    }

    async fn eval(
        &self,
        _script: &MemoryScript,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptReply, StoreError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("in-memory store is offline".to_string()));
        }

        let key = match keys {
            [key] => key,
            _ => {
                return Err(StoreError::Script(format!(
                    "expected exactly one key, got {}",
                    keys.len()
                )))
            }
        };
        let max_allowed_hits = parse_arg(args, 0, "max allowed hits")?;
        let window_seconds = parse_arg(args, 1, "window seconds")?;
        if window_seconds <= 0 {
            return Err(StoreError::Script(format!(
                "invalid expire time: {}",
                window_seconds
            )));
        }

        let breached =
            self.increment(key, max_allowed_hits, Duration::from_secs(window_seconds as u64))?;
        self.maybe_sweep();
        Ok(ScriptReply::Value(Reply::Integer(breached)))
    }
}
