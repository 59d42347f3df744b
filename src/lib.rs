//! # Celery Client
//!
//! A producer-side Celery client for Rust, using Redis as broker and result
//! backend. It builds wire-compatible Celery protocol v2 messages, pushes
//! them onto a queue list for an existing Python (or other) worker pool to
//! consume, and returns an async handle that polls the result store.
//!
//! Task execution, scheduling and retries stay on the worker side; this
//! crate only submits work and watches for its outcome.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use celery_client::TaskClient;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TaskClient::connect(
//!         "redis://127.0.0.1:6379/0",
//!         "redis://127.0.0.1:6379/0",
//!     )?;
//!
//!     let mut result = client.delay("tasks.add", vec![json!(4), json!(6)]).await?;
//!
//!     if result.wait(Duration::from_secs(10)).await {
//!         println!("outcome: {:?}", result.result());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod broker;
pub mod client;
pub mod error;
pub mod message;
pub mod result;

// Re-export commonly used types
pub use backend::{Backend, RedisBackend, ResultMessage, READY_STATES};
pub use broker::{Broker, RedisBroker};
pub use client::TaskClient;
pub use error::{TaskError, TaskResult};
pub use message::{TaskMessage, DEFAULT_QUEUE};
pub use result::AsyncResult;

/// Version of the Celery client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
