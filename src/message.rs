//! Celery protocol v2 message construction
//!
//! Builds the exact JSON envelope that Celery workers expect to pop off a
//! Redis queue list: a base64-encoded body plus `headers` and `properties`
//! records. Construction is pure; nothing here touches the network.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Name of the queue Celery consumes from when none is configured
pub const DEFAULT_QUEUE: &str = "celery";

/// Task-composition metadata embedded as the third element of the body.
///
/// This client does not build chains, groups or chords, but workers expect
/// the fields to be present (as nulls) for the body to be well-formed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BodyData {
    pub callbacks: Option<Vec<Value>>,
    pub errbacks: Option<Vec<Value>>,
    pub chain: Option<Vec<Value>>,
    pub chord: Option<Value>,
}

/// The decoded message body: positional args, keyword args and composition
/// metadata. Serialized on the wire as the JSON array `[args, kwargs, data]`,
/// then base64-encoded.
#[derive(Debug, Clone, Default)]
pub struct MessageBody {
    pub args: Vec<Value>,
    pub kwargs: serde_json::Map<String, Value>,
    pub data: BodyData,
}

impl MessageBody {
    /// Create a body carrying only positional arguments
    pub fn from_args(args: Vec<Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    /// Encode the body to its wire form: base64 of `[args, kwargs, data]`.
    ///
    /// Serialization of plain JSON values cannot realistically fail, but if
    /// it ever does the body degrades to base64 of an empty byte string
    /// rather than aborting the submission. Workers will reject such a
    /// message; a warning is logged so the degradation is visible.
    pub fn encode(&self) -> String {
        match serde_json::to_vec(&(&self.args, &self.kwargs, &self.data)) {
            Ok(bytes) => BASE64.encode(bytes),
            Err(e) => {
                tracing::warn!("body serialization failed, sending empty body: {}", e);
                BASE64.encode(b"")
            }
        }
    }

    /// Human-readable rendering of the positional args for the `argsrepr`
    /// header, defaulting to `"[]"` if serialization fails
    pub fn args_repr(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Task identity and execution metadata (`headers` record)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageHeaders {
    pub lang: String,
    pub task: String,
    pub id: String,
    pub shadow: Option<String>,
    pub eta: Option<String>,
    pub expires: Option<String>,
    pub group: Option<String>,
    pub group_index: Option<u64>,
    pub retries: u32,
    pub timelimit: [Option<u64>; 2],
    pub root_id: String,
    pub parent_id: Option<String>,
    pub argsrepr: String,
    pub kwargsrepr: String,
    pub origin: String,
    pub ignore_result: bool,
}

/// Exchange/routing-key pair binding a message to its destination queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryInfo {
    pub exchange: String,
    pub routing_key: String,
}

/// Delivery metadata (`properties` record)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageProperties {
    pub correlation_id: String,
    pub reply_to: String,
    pub delivery_mode: u8,
    pub delivery_info: DeliveryInfo,
    pub priority: u8,
    pub body_encoding: String,
    pub delivery_tag: String,
}

/// A complete task message as pushed onto the broker queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskMessage {
    pub body: String,
    #[serde(rename = "content-encoding")]
    pub content_encoding: String,
    #[serde(rename = "content-type")]
    pub content_type: String,
    pub headers: MessageHeaders,
    pub properties: MessageProperties,
}

impl TaskMessage {
    /// Build a message invoking `task` with `args` on the given queue.
    ///
    /// Every call generates a fresh ULID task id (also used as root id and
    /// correlation id), so two calls with identical inputs never collide.
    pub fn new(queue: &str, task: &str, args: Vec<Value>) -> Self {
        let id = Ulid::new().to_string();
        let body = MessageBody::from_args(args);

        Self {
            body: body.encode(),
            content_encoding: "utf-8".to_string(),
            content_type: "application/json".to_string(),
            headers: MessageHeaders {
                lang: "rs".to_string(),
                task: task.to_string(),
                id: id.clone(),
                shadow: None,
                eta: None,
                expires: None,
                group: None,
                group_index: None,
                retries: 0,
                timelimit: [None, None],
                root_id: id.clone(),
                parent_id: None,
                argsrepr: body.args_repr(),
                kwargsrepr: "{}".to_string(),
                origin: origin(),
                ignore_result: false,
            },
            properties: MessageProperties {
                correlation_id: id,
                reply_to: Ulid::new().to_string(),
                delivery_mode: 2,
                delivery_info: DeliveryInfo {
                    exchange: queue.to_string(),
                    routing_key: queue.to_string(),
                },
                priority: 0,
                body_encoding: "base64".to_string(),
                delivery_tag: Ulid::new().to_string(),
            },
        }
    }

    /// The generated task id
    pub fn task_id(&self) -> &str {
        &self.headers.id
    }
}

/// `"{pid}@{hostname}"`, with `"unknown"` when the hostname cannot be resolved
fn origin() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", std::process::id(), host)
}
