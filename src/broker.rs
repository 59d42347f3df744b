//! Broker side of the store abstraction: pushing messages onto queue lists

use async_trait::async_trait;
use redis::aio::Connection;
use redis::Client;
use tracing::debug;

use crate::error::TaskResult;
use crate::message::TaskMessage;

/// Capability to submit a task message to a named queue.
///
/// One method, so alternative broker transports can be substituted without
/// touching message construction or the client.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Serialize the message and append it to the head of `queue`.
    /// Serialization and transport failures surface unmodified.
    async fn send_message(&self, queue: &str, message: &TaskMessage) -> TaskResult<()>;
}

/// Broker over a Redis list, matching how Celery's Redis transport stores
/// queues: one list per queue name, producers LPUSH, workers BRPOP.
#[derive(Debug)]
pub struct RedisBroker {
    client: Client,
}

impl RedisBroker {
    /// Create a broker from a Redis URL (e.g. `redis://127.0.0.1:6379/0`)
    pub fn new(redis_url: &str) -> TaskResult<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn get_connection(&self) -> TaskResult<Connection> {
        Ok(self.client.get_async_connection().await?)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn send_message(&self, queue: &str, message: &TaskMessage) -> TaskResult<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.get_connection().await?;

        redis::cmd("LPUSH")
            .arg(queue)
            .arg(&payload)
            .query_async::<_, ()>(&mut conn)
            .await?;

        debug!("Pushed task {} onto queue {}", message.task_id(), queue);
        Ok(())
    }
}
