//! Key-value store collaborators.
//!
//! The rate limiter only ever needs one capability from its store: running a
//! short script atomically against a set of keys. [`ScriptStore`] captures that
//! command surface so the limiter can run against Redis in production and an
//! in-process store in tests.

mod memory;
mod redis;

pub use self::memory::{MemoryScript, MemoryStore};
pub use self::redis::RedisStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a [`ScriptStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The store ran the script and the script raised an error.
    #[error("Script error: {0}")]
    Script(String),
    /// The store cannot run this script at all.
    #[error("Unsupported script: {0}")]
    Unsupported(String),
    /// Error reported by the Redis client.
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

impl StoreError {
    /// Whether this error means the store could not be reached, as opposed
    /// to the store rejecting the script.
    pub fn is_transport(&self) -> bool {
        match self {
            StoreError::Connection(_) => true,
            StoreError::Script(_) | StoreError::Unsupported(_) => false,
            StoreError::Redis(e) => {
                e.is_io_error()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
                    || e.is_timeout()
            }
        }
    }
}

/// A reply value produced by a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Integer(i64),
    Status(String),
    Data(Vec<u8>),
    Array(Vec<Reply>),
    /// Any other reply shape, kept as its debug rendering.
    Other(String),
}

impl Reply {
    /// Short name of the reply shape, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Integer(_) => "integer",
            Reply::Status(_) => "status",
            Reply::Data(_) => "bulk string",
            Reply::Array(_) => "array",
            Reply::Other(_) => "other",
        }
    }
}

/// Outcome of a script execution.
///
/// Stores report "the script produced no value" separately from a value so
/// that callers have to handle the absent case on purpose.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptReply {
    Value(Reply),
    Absent,
}

/// A store that can execute a script atomically.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// A script prepared for repeated execution against this store.
    type Script: Send + Sync;

    /// Prepare a script from its source.
    ///
    /// This does not contact the store.
    fn prepare(&self, source: &str) -> Result<Self::Script, StoreError>;

    /// Run a prepared script against `keys` with `args` in one round trip.
    async fn eval(
        &self,
        script: &Self::Script,
        keys: &[String],
        args: &[String],
    ) -> Result<ScriptReply, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_transport() {
        assert!(StoreError::Connection("refused".to_string()).is_transport());
        assert!(!StoreError::Script("bad arg".to_string()).is_transport());
        assert!(!StoreError::Unsupported("lua".to_string()).is_transport());
    }

    #[test]
    fn test_redis_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = StoreError::from(::redis::RedisError::from(io));
        assert!(err.is_transport());
    }

    #[test]
    fn test_reply_kind() {
        assert_eq!(Reply::Integer(1).kind(), "integer");
        assert_eq!(Reply::Data(b"1".to_vec()).kind(), "bulk string");
        assert_eq!(Reply::Array(Vec::new()).kind(), "array");
    }
}
