//! Backend side of the store abstraction: fetching task results by id

use async_trait::async_trait;
use chrono::NaiveDateTime;
use redis::aio::Connection;
use redis::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{TaskError, TaskResult};

/// Key prefix under which Celery's Redis result backend stores task metadata
const RESULT_KEY_PREFIX: &str = "celery-task-meta-";

/// Layout of `date_done`: microsecond precision, no timezone, no trailing Z
const DATE_DONE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Statuses after which a task undergoes no further state transitions
pub const READY_STATES: [&str; 3] = ["SUCCESS", "FAILURE", "REVOKED"];

/// A task outcome as stored by the result backend.
///
/// `status` is Celery's status vocabulary (`PENDING`, `STARTED`, `SUCCESS`,
/// ...); `result` and `traceback` are arbitrary worker-produced payloads and
/// are kept as raw JSON values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage {
    pub task_id: String,
    pub status: String,
    pub result: Value,
    pub traceback: Value,
    pub children: Vec<Value>,
    pub date_done: Option<NaiveDateTime>,
}

impl ResultMessage {
    /// Whether the status is one of the terminal states
    pub fn is_terminal(&self) -> bool {
        READY_STATES.contains(&self.status.as_str())
    }

    /// Whether the task finished successfully
    pub fn is_success(&self) -> bool {
        self.status == "SUCCESS"
    }
}

/// Wire shape of the stored result. Strict on every field except
/// `date_done`, whose parse failures are non-fatal.
#[derive(Debug, Deserialize)]
struct RawResult {
    task_id: String,
    status: String,
    result: Value,
    traceback: Value,
    children: Vec<Value>,
    date_done: Option<String>,
}

impl From<RawResult> for ResultMessage {
    fn from(raw: RawResult) -> Self {
        let date_done = raw
            .date_done
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, DATE_DONE_FORMAT).ok());

        Self {
            task_id: raw.task_id,
            status: raw.status,
            result: raw.result,
            traceback: raw.traceback,
            children: raw.children,
            date_done,
        }
    }
}

/// Capability to read a single task result from the result store
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the stored result for `task_id`.
    ///
    /// Returns [`TaskError::ResultNotFound`] when no result has been stored
    /// yet and [`TaskError::MalformedResult`] when a stored payload does not
    /// decode into the expected shape.
    async fn fetch_result(&self, task_id: &str) -> TaskResult<ResultMessage>;
}

/// Backend over Celery's Redis result store: one `celery-task-meta-<id>`
/// string key per task
#[derive(Debug)]
pub struct RedisBackend {
    client: Client,
}

impl RedisBackend {
    /// Create a backend from a Redis URL (e.g. `redis://127.0.0.1:6379/0`)
    pub fn new(redis_url: &str) -> TaskResult<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn get_connection(&self) -> TaskResult<Connection> {
        Ok(self.client.get_async_connection().await?)
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn fetch_result(&self, task_id: &str) -> TaskResult<ResultMessage> {
        let mut conn = self.get_connection().await?;

        let payload: Option<String> = redis::cmd("GET")
            .arg(format!("{}{}", RESULT_KEY_PREFIX, task_id))
            .query_async(&mut conn)
            .await?;

        let payload = payload.ok_or_else(|| TaskError::ResultNotFound {
            task_id: task_id.to_string(),
        })?;

        let raw: RawResult = serde_json::from_str(&payload)
            .map_err(|e| TaskError::malformed_result(task_id, e))?;

        debug!("Fetched result for task {}: {}", task_id, raw.status);
        Ok(raw.into())
    }
}
