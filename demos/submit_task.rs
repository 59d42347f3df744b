//! Task submission example
//!
//! This example demonstrates how to:
//! 1. Connect a client to Redis
//! 2. Submit a task for an existing Celery worker
//! 3. Wait for the result with a timeout
//!
//! To run this example:
//! 1. Make sure Redis is running on localhost:6379
//! 2. Make sure a Celery worker with a `tasks.add` task is consuming the
//!    `celery` queue, e.g. `celery -A tasks worker`
//! 3. Run: cargo run --example submit_task

use celery_client::TaskClient;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let client = TaskClient::connect(
        "redis://127.0.0.1:6379/0",
        "redis://127.0.0.1:6379/0",
    )?;

    let mut result = client.delay("tasks.add", vec![json!(4), json!(6)]).await?;
    info!("Submitted task {}", result.task_id());

    if result.wait(Duration::from_secs(10)).await {
        let succeeded = result.succeeded().await;
        let outcome = result.result().expect("ready implies a cached result");
        if succeeded {
            info!("Task succeeded: {}", outcome.result);
        } else {
            warn!("Task ended with status {}", outcome.status);
        }
    } else {
        warn!("Timed out waiting for task {}", result.task_id());
    }

    Ok(())
}
