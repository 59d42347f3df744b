//! Asynchronous result handle with lazy refresh
//!
//! An [`AsyncResult`] is handed out at submission time and resolves lazily:
//! it only reads the result store when asked, caches the last outcome, and
//! stops reading entirely once a terminal status has been observed.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::backend::{Backend, ResultMessage};
use crate::error::TaskResult;

/// Cadence at which [`AsyncResult::wait`] polls the result store
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle to an in-flight or completed task.
///
/// The cached result is read and replaced through `&mut self`, so a handle
/// cannot be refreshed concurrently; each awaiting party should own its own
/// handle (handles share nothing but the underlying store).
pub struct AsyncResult {
    task_id: String,
    backend: Arc<dyn Backend>,
    cached: Option<ResultMessage>,
}

impl AsyncResult {
    /// Create a handle for a task id backed by the given result store
    pub fn new(task_id: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            task_id: task_id.into(),
            backend,
            cached: None,
        }
    }

    /// The id of the task this handle tracks
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The last fetched result, if any
    pub fn result(&self) -> Option<&ResultMessage> {
        self.cached.as_ref()
    }

    /// Re-fetch the result unless a terminal status is already cached.
    ///
    /// A terminal status is authoritative: once cached, refresh becomes a
    /// no-op and later store failures can never erase it. On a fetch error
    /// the cache is left untouched and the error is returned.
    pub async fn refresh(&mut self) -> TaskResult<()> {
        if self.cached.as_ref().is_some_and(|r| r.is_terminal()) {
            return Ok(());
        }

        let message = self.backend.fetch_result(&self.task_id).await?;
        self.cached = Some(message);
        Ok(())
    }

    /// Whether the task has reached a terminal status.
    ///
    /// Fetch errors are treated as "not yet ready".
    pub async fn is_ready(&mut self) -> bool {
        let _ = self.refresh().await;
        self.cached.as_ref().is_some_and(|r| r.is_terminal())
    }

    /// Whether the task finished with status `SUCCESS`.
    ///
    /// Fetch errors are treated as "not successful (yet)".
    pub async fn succeeded(&mut self) -> bool {
        let _ = self.refresh().await;
        self.cached.as_ref().is_some_and(|r| r.is_success())
    }

    /// Poll every 50 ms until the task is ready or `timeout` elapses.
    ///
    /// Returns `true` when a terminal status was observed within the
    /// timeout, `false` otherwise. Transient store errors during the wait
    /// are swallowed; dropping the future cancels the wait.
    pub async fn wait(&mut self, timeout: Duration) -> bool {
        let poll = async {
            let mut ticker = interval(POLL_INTERVAL);
            loop {
                ticker.tick().await;
                if self.is_ready().await {
                    return;
                }
            }
        };

        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}

impl std::fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResult")
            .field("task_id", &self.task_id)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn message(status: &str, result: Value) -> ResultMessage {
        ResultMessage {
            task_id: "task-1".to_string(),
            status: status.to_string(),
            result,
            traceback: Value::Null,
            children: vec![],
            date_done: None,
        }
    }

    fn transport_error() -> TaskError {
        TaskError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    /// Replays a fixed sequence of responses; repeats the last one after
    /// the script runs out.
    enum Step {
        Message(ResultMessage),
        NotFound,
        Transport,
    }

    struct ScriptedBackend {
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Option<Step>>,
        fetches: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                last: Mutex::new(None),
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn respond(&self, step: &Step) -> TaskResult<ResultMessage> {
            match step {
                Step::Message(m) => Ok(m.clone()),
                Step::NotFound => Err(TaskError::ResultNotFound {
                    task_id: "task-1".to_string(),
                }),
                Step::Transport => Err(transport_error()),
            }
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn fetch_result(&self, _task_id: &str) -> TaskResult<ResultMessage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(step) = self.steps.lock().unwrap().pop_front() {
                let response = self.respond(&step);
                *self.last.lock().unwrap() = Some(step);
                return response;
            }
            match &*self.last.lock().unwrap() {
                Some(step) => self.respond(step),
                None => Err(TaskError::ResultNotFound {
                    task_id: "task-1".to_string(),
                }),
            }
        }
    }

    /// Reports PENDING until a deadline, SUCCESS afterwards
    struct ReadyAfter {
        ready_at: Instant,
    }

    #[async_trait]
    impl Backend for ReadyAfter {
        async fn fetch_result(&self, _task_id: &str) -> TaskResult<ResultMessage> {
            if Instant::now() >= self.ready_at {
                Ok(message("SUCCESS", json!(42)))
            } else {
                Ok(message("PENDING", Value::Null))
            }
        }
    }

    #[tokio::test]
    async fn pending_is_not_ready() {
        let backend = ScriptedBackend::new(vec![Step::Message(message("PENDING", Value::Null))]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(!handle.is_ready().await);
        assert!(!handle.succeeded().await);
    }

    #[tokio::test]
    async fn success_is_ready_and_succeeded() {
        let backend = ScriptedBackend::new(vec![Step::Message(message("SUCCESS", json!(42)))]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(handle.is_ready().await);
        assert!(handle.succeeded().await);
        assert_eq!(handle.result().unwrap().result, json!(42));
    }

    #[tokio::test]
    async fn failure_is_ready_but_not_succeeded() {
        let backend = ScriptedBackend::new(vec![Step::Message(message("FAILURE", Value::Null))]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(handle.is_ready().await);
        assert!(!handle.succeeded().await);
    }

    #[tokio::test]
    async fn revoked_is_terminal() {
        let backend = ScriptedBackend::new(vec![Step::Message(message("REVOKED", Value::Null))]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(handle.is_ready().await);
        assert!(!handle.succeeded().await);
    }

    #[tokio::test]
    async fn refresh_replaces_non_terminal_cache() {
        let backend = ScriptedBackend::new(vec![
            Step::Message(message("PENDING", Value::Null)),
            Step::Message(message("STARTED", Value::Null)),
            Step::Message(message("SUCCESS", json!("done"))),
        ]);
        let mut handle = AsyncResult::new("task-1", backend.clone());

        handle.refresh().await.unwrap();
        assert_eq!(handle.result().unwrap().status, "PENDING");
        handle.refresh().await.unwrap();
        assert_eq!(handle.result().unwrap().status, "STARTED");
        handle.refresh().await.unwrap();
        assert_eq!(handle.result().unwrap().status, "SUCCESS");
        assert_eq!(backend.fetch_count(), 3);
    }

    #[tokio::test]
    async fn terminal_status_stops_fetching() {
        let backend = ScriptedBackend::new(vec![
            Step::Message(message("SUCCESS", json!(1))),
            Step::Transport,
        ]);
        let mut handle = AsyncResult::new("task-1", backend.clone());

        handle.refresh().await.unwrap();
        // further refreshes are no-ops even though the store now errors
        handle.refresh().await.unwrap();
        assert!(handle.is_ready().await);
        assert!(handle.succeeded().await);
        assert_eq!(handle.result().unwrap().status, "SUCCESS");
        assert_eq!(backend.fetch_count(), 1);
    }

    #[tokio::test]
    async fn fetch_error_propagates_and_leaves_cache_untouched() {
        let backend = ScriptedBackend::new(vec![
            Step::Message(message("PENDING", Value::Null)),
            Step::Transport,
        ]);
        let mut handle = AsyncResult::new("task-1", backend);

        handle.refresh().await.unwrap();
        let err = handle.refresh().await.unwrap_err();
        assert!(matches!(err, TaskError::Redis(_)));
        assert_eq!(handle.result().unwrap().status, "PENDING");
    }

    #[tokio::test]
    async fn predicates_swallow_fetch_errors() {
        let backend = ScriptedBackend::new(vec![Step::Transport]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(!handle.is_ready().await);
        assert!(!handle.succeeded().await);
        assert!(handle.result().is_none());
    }

    #[tokio::test]
    async fn missing_result_reads_as_not_ready() {
        let backend = ScriptedBackend::new(vec![Step::NotFound]);
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(!handle.is_ready().await);
        let err = handle.refresh().await.unwrap_err();
        assert!(matches!(err, TaskError::ResultNotFound { .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_true_once_ready() {
        let backend = Arc::new(ReadyAfter {
            ready_at: Instant::now() + Duration::from_millis(80),
        });
        let mut handle = AsyncResult::new("task-1", backend);

        let started = Instant::now();
        assert!(handle.wait(Duration::from_secs(5)).await);
        // 50 ms cadence: readiness at 80 ms is observed on the 100 ms tick
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(80), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(150), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_never_ready() {
        let backend = Arc::new(ReadyAfter {
            ready_at: Instant::now() + Duration::from_millis(300),
        });
        let mut handle = AsyncResult::new("task-1", backend);

        assert!(!handle.wait(Duration::from_millis(200)).await);
        // the deadline has since passed, a later wait sees the result
        assert!(handle.wait(Duration::from_millis(200)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_polls_at_fixed_cadence() {
        let backend = ScriptedBackend::new(vec![Step::Message(message("PENDING", Value::Null))]);
        let mut handle = AsyncResult::new("task-1", backend.clone());

        assert!(!handle.wait(Duration::from_millis(200)).await);
        // ticks at 0, 50, 100, 150 ms; the 200 ms tick loses to the deadline
        assert!(backend.fetch_count() >= 4);
        assert!(backend.fetch_count() <= 5);
    }
}
