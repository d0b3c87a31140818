//! Cloud task client
//!
//! One [`CloudTaskClient`] interface with three backends, picked once from
//! configuration by [`CloudBackend::connect`]:
//!
//! - [`HttpCloudClient`]: remote task API with a bearer key
//! - [`CliCloudClient`]: the `ade-cloud` companion binary
//! - [`FixtureCloudClient`]: JSON files on disk, used when nothing is configured

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::capabilities::CloudDetector;
use crate::error::Result;

pub mod cli;
pub mod fixture;
pub mod http;

pub use cli::CliCloudClient;
pub use fixture::FixtureCloudClient;
pub use http::HttpCloudClient;

/// Summary of a remote task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Opaque task id
    pub id: String,
    /// Task title
    pub title: String,
    /// Backend-defined status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Last update, as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One turn of a task conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// `system`, `user`, `assistant`, or a backend-specific role
    pub role: String,
    /// Turn text
    pub content: String,
    /// When the turn happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Extra data attached to the turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Full view of a remote task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    /// Summary fields
    #[serde(flatten)]
    pub info: TaskInfo,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered conversation turns
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
    /// Extra data attached to the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Unified diff produced by the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Options for applying a task's changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOptions {
    /// Target branch; backends pick one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Force a three-way merge
    #[serde(default)]
    pub three_way: bool,
}

/// Result of applying a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    /// Branch the changes landed on
    pub branch: String,
    /// Whether the changes were applied
    pub applied: bool,
    /// Backend message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Access to remote tasks
#[async_trait]
pub trait CloudTaskClient: Send + Sync {
    /// List tasks in backend order
    async fn list(&self) -> Result<Vec<TaskInfo>>;

    /// Fetch one task; unknown ids fail with [`Error::NotFound`](crate::Error::NotFound)
    async fn show(&self, id: &str) -> Result<TaskDetail>;

    /// Fetch the raw diff of a task
    async fn diff(&self, id: &str) -> Result<String>;

    /// Apply a task's changes
    async fn apply(&self, id: &str, options: &ApplyOptions) -> Result<ApplyOutcome>;

    /// Whether this backend reaches a real cloud
    async fn is_available(&self) -> Result<bool>;
}

/// Adapts any task client into a capability [`CloudDetector`]
pub struct ClientDetector<'a>(pub &'a dyn CloudTaskClient);

#[async_trait]
impl CloudDetector for ClientDetector<'_> {
    async fn detect(&self) -> Result<bool> {
        self.0.is_available().await
    }
}

/// Which backend to construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudBackend {
    /// Remote HTTP API
    Http {
        /// Base URL, e.g. `https://cloud.example.com/api`
        endpoint: String,
        /// Bearer credential
        api_key: String,
    },
    /// Companion CLI binary
    Cli {
        /// Binary name or path
        binary: String,
    },
    /// Local fixture directory
    Fixture {
        /// Directory holding `tasks.json` and `<id>.json`
        dir: PathBuf,
    },
}

impl CloudBackend {
    /// Construct the selected client
    pub fn connect(&self) -> Arc<dyn CloudTaskClient> {
        match self {
            CloudBackend::Http { endpoint, api_key } => {
                Arc::new(HttpCloudClient::new(endpoint.clone(), api_key.clone()))
            }
            CloudBackend::Cli { binary } => Arc::new(CliCloudClient::new(binary.clone())),
            CloudBackend::Fixture { dir } => Arc::new(FixtureCloudClient::new(dir.clone())),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CloudBackend::Http { .. } => "http",
            CloudBackend::Cli { .. } => "cli",
            CloudBackend::Fixture { .. } => "fixture",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_detail_flattens_info_fields() {
        let detail: TaskDetail = serde_json::from_value(json!({
            "id": "task-1",
            "title": "Fix it",
            "updatedAt": "2024-05-01",
            "conversation": [{"role": "user", "content": "please"}],
            "diff": "--- a\n+++ b\n"
        }))
        .unwrap();

        assert_eq!(detail.info.id, "task-1");
        assert_eq!(detail.info.updated_at.as_deref(), Some("2024-05-01"));
        assert_eq!(detail.conversation.len(), 1);
        assert!(detail.description.is_none());
    }

    #[test]
    fn apply_options_use_camel_case() {
        let body = serde_json::to_value(ApplyOptions {
            branch: None,
            three_way: true,
        })
        .unwrap();
        assert_eq!(body, json!({"threeWay": true}));
    }

    #[test]
    fn backend_names() {
        let fixture = CloudBackend::Fixture { dir: "fixtures".into() };
        assert_eq!(fixture.name(), "fixture");
        assert_eq!(CloudBackend::Cli { binary: "ade-cloud".into() }.name(), "cli");
    }
}
