//! Redis-backed script store.

use async_trait::async_trait;
use ::redis::aio::ConnectionManager;
use ::redis::{Client, Script, Value};
use tracing::{debug, info};

use super::{Reply, ScriptReply, ScriptStore, StoreError};
use crate::error::{RateLimitError, Result};

/// A [`ScriptStore`] backed by a Redis server.
///
/// The connection manager is cheap to clone and multiplexes every call over
/// one connection, reconnecting on its own after failures. Scripts run via
/// `EVALSHA` and are loaded with `SCRIPT LOAD` the first time a server does
/// not know them.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Wrap an existing connection manager.
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| RateLimitError::Config(format!("Invalid Redis URL {}: {}", url, e)))?;

        info!(url = %url, "Connecting to Redis");

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| RateLimitError::Transport(StoreError::Redis(e)))?;

        Ok(Self::new(connection))
    }
}

#[async_trait]
impl ScriptStore for RedisStore {
    type Script = Script;

    fn prepare(&self, source: &str) -> std::result::Result<Script, StoreError> {
        if source.trim().is_empty() {
            return Err(StoreError::Unsupported("empty script source".to_string()));
        }
        let script = Script::new(source);
        debug!(sha = %script.get_hash(), "Prepared Redis script");
        Ok(script)
    }

    async fn eval(
        &self,
        script: &Script,
        keys: &[String],
        args: &[String],
    ) -> std::result::Result<ScriptReply, StoreError> {
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(key);
        }
        for arg in args {
            invocation.arg(arg);
        }

        let mut connection = self.connection.clone();
        let value: Value = invocation.invoke_async(&mut connection).await?;
        Ok(script_reply(value))
    }
}

fn script_reply(value: Value) -> ScriptReply {
    match value {
        Value::Nil => ScriptReply::Absent,
        other => ScriptReply::Value(reply(other)),
    }
}

fn reply(value: Value) -> Reply {
    match value {
        Value::Int(n) => Reply::Integer(n),
        Value::Okay => Reply::Status("OK".to_string()),
        Value::SimpleString(s) => Reply::Status(s),
        Value::BulkString(data) => Reply::Data(data),
        Value::Array(items) => Reply::Array(items.into_iter().map(reply).collect()),
        other => Reply::Other(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_is_absent() {
        assert_eq!(script_reply(Value::Nil), ScriptReply::Absent);
    }

    #[test]
    fn test_integer_reply() {
        assert_eq!(
            script_reply(Value::Int(1)),
            ScriptReply::Value(Reply::Integer(1))
        );
    }

    #[test]
    fn test_nested_reply() {
        let value = Value::Array(vec![
            Value::Int(0),
            Value::BulkString(b"hits".to_vec()),
            Value::Okay,
        ]);

        assert_eq!(
            script_reply(value),
            ScriptReply::Value(Reply::Array(vec![
                Reply::Integer(0),
                Reply::Data(b"hits".to_vec()),
                Reply::Status("OK".to_string()),
            ]))
        );
    }

    #[test]
    fn test_double_reply_is_other() {
        assert!(matches!(
            script_reply(Value::Double(1.5)),
            ScriptReply::Value(Reply::Other(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server at REDIS_URL"]
    async fn test_counter_script_against_redis() {
        use crate::ratelimit::RateLimiter;

        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let store = RedisStore::connect(&url).await.unwrap();
        let limiter = RateLimiter::new(store, 2, 10).unwrap();
        let tracker = format!("redis-store-test-{}", std::process::id());

        assert!(limiter.allow(&tracker).await.unwrap());
        assert!(limiter.allow(&tracker).await.unwrap());
        assert!(!limiter.allow(&tracker).await.unwrap());
    }
}
