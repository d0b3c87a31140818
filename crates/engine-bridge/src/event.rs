//! Engine execution events
//!
//! Engines print one JSON object per line, discriminated by a `"type"`
//! field. [`ExecutionEvent`] mirrors that wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Start time as reported by the engine
///
/// Engines disagree on the format, so text is kept verbatim and numbers
/// (usually epoch milliseconds) are kept as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTimestamp {
    /// Any textual timestamp, e.g. RFC 3339
    Text(String),
    /// A numeric timestamp
    Epoch(Number),
}

/// A single event emitted by an engine during execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecutionEvent {
    /// Execution began
    Start {
        /// When execution began
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<EventTimestamp>,
        /// Process id, if the engine runs in a child process
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pid: Option<u32>,
        /// Arbitrary metadata describing the run
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<Map<String, Value>>,
    },
    /// A piece of generated text
    Token {
        /// The generated text
        #[serde(rename = "value")]
        text: String,
        /// Optional ordering hint
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<Number>,
    },
    /// The engine invoked a tool
    #[serde(rename = "tool")]
    ToolCall {
        /// Tool name
        #[serde(rename = "toolName")]
        name: String,
        /// Tool input, passed through untouched
        #[serde(default)]
        payload: Value,
    },
    /// The engine produced an artifact (file, patch, screenshot, ...)
    Artifact {
        /// Kind of artifact
        #[serde(rename = "artifactType")]
        kind: String,
        /// Human readable description
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Where the artifact can be found
        #[serde(rename = "uri", default, skip_serializing_if = "Option::is_none")]
        locator: Option<String>,
        /// Inline artifact content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    /// Progress update
    Status {
        /// Short status string, e.g. `running`
        status: String,
        /// Additional detail
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    /// The engine reported an error in-band
    Error {
        /// Error message
        message: String,
        /// Stack trace, if the engine provides one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        /// Whether the engine considers the run unrecoverable
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fatal: Option<bool>,
    },
    /// Execution finished
    Done {
        /// Optional summarized result
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
}

impl ExecutionEvent {
    /// The wire discriminator of this event
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionEvent::Start { .. } => "start",
            ExecutionEvent::Token { .. } => "token",
            ExecutionEvent::ToolCall { .. } => "tool",
            ExecutionEvent::Artifact { .. } => "artifact",
            ExecutionEvent::Status { .. } => "status",
            ExecutionEvent::Error { .. } => "error",
            ExecutionEvent::Done { .. } => "done",
        }
    }

    /// Create a token event
    pub fn token(text: impl Into<String>) -> Self {
        ExecutionEvent::Token {
            text: text.into(),
            index: None,
        }
    }

    /// Create a status event
    pub fn status(status: impl Into<String>, detail: Option<String>) -> Self {
        ExecutionEvent::Status {
            status: status.into(),
            detail,
        }
    }
}
