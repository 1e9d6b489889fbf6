//! Fixed-window rate limiting backed by an atomic store-side counter script.

mod backend;
mod key;
mod limiter;
mod policy;
mod script;

pub use backend::RateLimiterBackend;
pub use key::{TrackerKey, KEY_PREFIX};
pub use limiter::RateLimiter;
pub use policy::{Policy, MAX_POLICY_VALUE};
pub use script::{CounterScript, ScriptOutcome, COUNTER_SCRIPT};
