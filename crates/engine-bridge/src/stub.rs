//! In-process stub engine
//!
//! Used when no real engine is configured. It echoes the prompt back and
//! serves one canned cloud task.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use serde_json::json;

use crate::capabilities::EngineCapabilities;
use crate::cloud::{
    ApplyOptions, ApplyOutcome, CloudTaskClient, ConversationTurn, TaskDetail, TaskInfo,
};
use crate::engine::{Engine, EventStream};
use crate::error::Result;
use crate::event::{EventTimestamp, ExecutionEvent};
use crate::request::ExecutionRequest;

/// Id of the only stub task
pub const STUB_TASK_ID: &str = "stub-task-1";

/// Engine that echoes prompts without spawning anything
#[derive(Debug, Clone, Default)]
pub struct StubEngine {
    cloud: StubCloudClient,
}

impl StubEngine {
    /// Create the stub
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Engine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn exec(&self, request: &ExecutionRequest) -> Result<EventStream> {
        let now = Utc::now();
        let prompt = request.prompt.clone();
        let events = vec![
            ExecutionEvent::Start {
                timestamp: Some(EventTimestamp::Text(now.to_rfc3339())),
                pid: None,
                metadata: None,
            },
            ExecutionEvent::status("running", Some(format!("Stub executing prompt: {prompt}"))),
            ExecutionEvent::token(format!("echo:{prompt}")),
            ExecutionEvent::Done {
                result: Some(json!({
                    "echoed": prompt,
                    "timestamp": now.to_rfc3339(),
                })),
            },
        ];
        Ok(stream::iter(events.into_iter().map(Ok)).boxed())
    }

    async fn capabilities(&self) -> Result<EngineCapabilities> {
        Ok(EngineCapabilities::default())
    }

    fn cloud(&self) -> &dyn CloudTaskClient {
        &self.cloud
    }
}

/// Cloud client with one canned task
#[derive(Debug, Clone, Copy, Default)]
pub struct StubCloudClient;

fn stub_info(id: &str, title: String) -> TaskInfo {
    TaskInfo {
        id: id.to_string(),
        title,
        status: Some("pending".to_string()),
        updated_at: Some(Utc::now().to_rfc3339()),
    }
}

#[async_trait]
impl CloudTaskClient for StubCloudClient {
    async fn list(&self) -> Result<Vec<TaskInfo>> {
        Ok(vec![stub_info(STUB_TASK_ID, "Stub Task".to_string())])
    }

    async fn show(&self, id: &str) -> Result<TaskDetail> {
        Ok(TaskDetail {
            info: stub_info(id, format!("Stub Task {id}")),
            description: Some("Stub task served without a cloud backend.".to_string()),
            conversation: vec![ConversationTurn {
                role: "system".to_string(),
                content: "Stub engine ready.".to_string(),
                timestamp: None,
                metadata: None,
            }],
            metadata: None,
            diff: Some(String::new()),
        })
    }

    async fn diff(&self, id: &str) -> Result<String> {
        Ok(format!("--- {id}\n+++ {id}\n"))
    }

    async fn apply(&self, id: &str, options: &ApplyOptions) -> Result<ApplyOutcome> {
        Ok(ApplyOutcome {
            branch: options.branch.clone().unwrap_or_else(|| format!("stub/{id}")),
            applied: true,
            message: Some("Stub apply succeeded.".to_string()),
        })
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(false)
    }
}
