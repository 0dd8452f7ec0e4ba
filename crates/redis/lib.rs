//! Redis store for the rb task queue.
//!
//! Maps the store primitives onto Redis commands:
//!
//! | primitive | command |
//! |---|---|
//! | transaction | `MULTI` / `HMSET` / `LPUSH` / `EXEC` |
//! | transfer_tail | `RPOPLPUSH` |
//! | get_mapping | `HGETALL` |
//! | publish / subscribe | `PUBLISH` / `SUBSCRIBE` |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rb_core::Client;
//! use rb_redis::RedisStore;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> rb_core::Result<()> {
//!     let store = RedisStore::new("redis://localhost").await?;
//!     let client = Client::new(store);
//!     client.enqueue("resize.image", 30_000, &json!({"width": 640})).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use rb_core::{ClientConfig, Notifications, RbError, Reply, Result, Store, WriteOp};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;

/// Maps logical keys and channels to Redis keys.
///
/// Without a namespace keys are used verbatim, which is what other
/// producers and consumers of the same store expect.
#[derive(Debug, Clone, Default)]
pub struct RedisKeys {
    namespace: Option<String>,
}

impl RedisKeys {
    /// Create a new RedisKeys instance with an optional namespace.
    pub fn new(namespace: Option<String>) -> Self {
        Self { namespace }
    }

    /// Get the namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Redis key (or channel) for a logical name.
    pub fn key(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, name),
            None => name.to_string(),
        }
    }
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    keys: RedisKeys,
}

fn store_err(e: redis::RedisError) -> RbError {
    RbError::Store(e.to_string())
}

fn reply_from_value(value: redis::Value) -> Reply {
    match value {
        redis::Value::Okay => Reply::Ok,
        redis::Value::SimpleString(s) if s == "OK" => Reply::Ok,
        redis::Value::Int(n) => Reply::Integer(n),
        other => Reply::Other(format!("{:?}", other)),
    }
}

impl RedisStore {
    /// Connect to Redis without a namespace.
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::connect(&ClientConfig::new(redis_url)).await
    }

    /// Connect using a client configuration.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(store_err)?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(store_err)?;
        tracing::debug!(namespace = ?config.namespace, "Connected to Redis");
        Ok(Self {
            client,
            conn,
            keys: RedisKeys::new(config.namespace.clone()),
        })
    }

    /// Create a store from an existing client and connection manager.
    pub fn with_connection(
        client: redis::Client,
        conn: ConnectionManager,
        namespace: Option<String>,
    ) -> Self {
        Self {
            client,
            conn,
            keys: RedisKeys::new(namespace),
        }
    }

    /// Get the Redis keys manager.
    pub fn keys(&self) -> &RedisKeys {
        &self.keys
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<Vec<Reply>> {
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                WriteOp::SetMapping { key, fields } => {
                    pipe.hset_multiple(self.keys.key(key), fields.as_slice());
                }
                WriteOp::PushQueue { queue, id } => {
                    pipe.lpush(self.keys.key(queue), id);
                }
            }
        }

        let values: Vec<redis::Value> = pipe.query_async(&mut conn).await.map_err(store_err)?;
        Ok(values.into_iter().map(reply_from_value).collect())
    }

    async fn transfer_tail(&self, src: &str, dst: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let moved: Option<String> = conn
            .rpoplpush(self.keys.key(src), self.keys.key(dst))
            .await
            .map_err(store_err)?;
        Ok(moved)
    }

    async fn get_mapping(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let mut conn = self.conn.clone();
        let mapping: HashMap<String, String> =
            conn.hgetall(self.keys.key(key)).await.map_err(store_err)?;
        Ok((!mapping.is_empty()).then_some(mapping))
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(self.keys.key(channel), message)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Notifications> {
        let channel = self.keys.key(channel);
        let mut pubsub = self.client.get_async_pubsub().await.map_err(store_err)?;
        pubsub.subscribe(&channel).await.map_err(store_err)?;

        let (tx, notifications) = Notifications::channel();
        tokio::spawn(async move {
            let messages = pubsub.into_on_message();
            tokio::pin!(messages);
            loop {
                // Stop as soon as the receiver is gone, even on a quiet channel.
                let msg = tokio::select! {
                    msg = messages.next() => match msg {
                        Some(msg) => msg,
                        None => break,
                    },
                    _ = tx.closed() => break,
                };
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(channel = %channel, error = %e, "Unreadable message payload");
                        continue;
                    }
                };
                match tx.try_send(payload) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
            tracing::debug!(channel = %channel, "Subscription closed");
        });

        Ok(notifications)
    }

    async fn queue_len(&self, queue: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(self.keys.key(queue)).await.map_err(store_err)?;
        Ok(len)
    }
}


// ========== Integration Tests (require Redis) ==========
