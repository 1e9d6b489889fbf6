//! Rate Limit Redis - Fixed-Window Rate Limiting over a Shared Store
//!
//! This crate enforces a request-rate limit shared by every application
//! instance pointed at the same key-value store. Counting happens entirely in
//! the store, inside a script it runs atomically, so instances never need to
//! coordinate with each other.
//!
//! ```no_run
//! use rate_limit_redis::{RateLimiter, RedisStore};
//!
//! # async fn example() -> rate_limit_redis::error::Result<()> {
//! let store = RedisStore::connect("redis://localhost:6379").await?;
//! let limiter = RateLimiter::new(store, 5, 10)?;
//!
//! if limiter.allow("192.168.1.0").await? {
//!     // handle the request
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod store;

pub use error::{RateLimitError, Result};
pub use ratelimit::{Policy, RateLimiter, RateLimiterBackend, TrackerKey};
pub use store::{MemoryStore, RedisStore, ScriptStore};
