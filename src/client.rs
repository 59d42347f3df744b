//! Client interface for submitting tasks to Celery workers

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::{Backend, RedisBackend};
use crate::broker::{Broker, RedisBroker};
use crate::error::{TaskError, TaskResult};
use crate::message::{TaskMessage, DEFAULT_QUEUE};
use crate::result::AsyncResult;

/// Client for submitting tasks to a Celery worker pool.
///
/// Holds a broker to push messages through and a backend for the returned
/// result handles to poll. Submission builds an independent message per
/// call, so a client can be shared freely across tasks and threads.
pub struct TaskClient {
    broker: Arc<dyn Broker>,
    backend: Arc<dyn Backend>,
}

impl TaskClient {
    /// Create a client from broker and backend implementations
    pub fn new(broker: Arc<dyn Broker>, backend: Arc<dyn Backend>) -> Self {
        Self { broker, backend }
    }

    /// Create a client with Redis broker and backend from connection URLs
    pub fn connect(broker_url: &str, backend_url: &str) -> TaskResult<Self> {
        let broker = RedisBroker::new(broker_url)?;
        let backend = RedisBackend::new(backend_url)?;
        info!("Connected to broker {} and backend {}", broker_url, backend_url);
        Ok(Self::new(Arc::new(broker), Arc::new(backend)))
    }

    /// Submit a task to the default `celery` queue
    pub async fn delay(&self, task: &str, args: Vec<Value>) -> TaskResult<AsyncResult> {
        self.delay_with_queue(DEFAULT_QUEUE, task, args).await
    }

    /// Submit a task to a specific queue.
    ///
    /// On success returns a handle that resolves against the result backend;
    /// on broker failure the error is returned and no handle is created.
    pub async fn delay_with_queue(
        &self,
        queue: &str,
        task: &str,
        args: Vec<Value>,
    ) -> TaskResult<AsyncResult> {
        if queue.is_empty() {
            return Err(TaskError::config("queue name must not be empty"));
        }
        if task.is_empty() {
            return Err(TaskError::config("task name must not be empty"));
        }

        let message = TaskMessage::new(queue, task, args);
        self.broker.send_message(queue, &message).await?;

        debug!("Submitted task {} ({}) to queue {}", message.task_id(), task, queue);
        Ok(AsyncResult::new(message.task_id(), self.backend.clone()))
    }
}
