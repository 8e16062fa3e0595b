use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Pub/sub sink for change sets
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, channel: &str, event: &str, data: &Value) -> Result<(), PublishError>;
}

/// Wraps a payload with its event label, the message shape subscribers read
pub fn envelope(event: &str, data: &Value) -> String {
    json!({ "event": event, "data": data }).to_string()
}

/// Publishes over Redis PUBLISH on a shared multiplexed connection
#[derive(Clone)]
pub struct RedisPublisher {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisPublisher {
    pub async fn connect(redis_url: &str) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Publisher for RedisPublisher {
    async fn publish(&self, channel: &str, event: &str, data: &Value) -> Result<(), PublishError> {
        let message = envelope(event, data);
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel, message).await?;
        tracing::debug!("Published {} to {} ({} subscribers)", event, channel, receivers);
        Ok(())
    }
}
