//! Error types for the Celery client

use thiserror::Error;

/// Result type alias for client operations
pub type TaskResult<T> = Result<T, TaskError>;

/// Error types for task submission and result retrieval
#[derive(Error, Debug)]
pub enum TaskError {
    /// Redis connection or operation errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No result stored for the task yet
    #[error("Result not found: {task_id}")]
    ResultNotFound { task_id: String },

    /// Result payload present but its fields do not match the expected shape
    #[error("Malformed result for task {task_id}: {source}")]
    MalformedResult {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic errors for wrapping other error types
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl TaskError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a malformed-result error for a given task
    pub fn malformed_result<S: Into<String>>(task_id: S, source: serde_json::Error) -> Self {
        Self::MalformedResult {
            task_id: task_id.into(),
            source,
        }
    }

    /// Check if the error is recoverable (can be retried)
    ///
    /// A missing result key is recoverable: the worker may simply not have
    /// stored anything yet. A malformed result never fixes itself on retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TaskError::Redis(_) => true,
            TaskError::ResultNotFound { .. } => true,
            TaskError::Serialization(_) => false,
            TaskError::MalformedResult { .. } => false,
            TaskError::Config { .. } => false,
            TaskError::Internal(_) => false,
        }
    }
}
