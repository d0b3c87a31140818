//! Task client backed by the `ade-cloud` companion binary

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{ApplyOptions, ApplyOutcome, CloudTaskClient, TaskDetail, TaskInfo};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::launcher::LocalLauncher;

/// Default name of the companion binary
pub const DEFAULT_CLOUD_BIN: &str = "ade-cloud";

/// Exit status `ade-cloud` uses for an unknown task
pub const NOT_FOUND_EXIT_CODE: i32 = 4;

/// Hint shown when the companion binary is missing
pub const CLOUD_MISSING_MESSAGE: &str =
    "The `ade-cloud` CLI is not installed or not found in PATH. \
     Install the cloud-shim crate or set ADE_ENGINE=stub.";

/// Runs `ade-cloud <subcommand>` for every operation
#[derive(Debug, Clone)]
pub struct CliCloudClient {
    binary: String,
    launcher: LocalLauncher,
}

impl CliCloudClient {
    /// Use the given companion binary
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            launcher: LocalLauncher,
        }
    }

    /// The companion binary
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run one subcommand; `task` names the id an unknown-task exit refers to
    async fn run_text(&self, args: &[&str], task: Option<&str>) -> Result<String> {
        let command = Command::builder(&self.binary).args(args).build();
        let output = self
            .launcher
            .output(&command)
            .await
            .map_err(|e| e.with_hint(CLOUD_MISSING_MESSAGE))?;

        if let (Some(id), Some(NOT_FOUND_EXIT_CODE)) = (task, output.status.code) {
            return Err(Error::NotFound { id: id.to_string() });
        }
        if !output.status.success() {
            return Err(Error::remote(
                format!("{} {}", self.binary, args.join(" ")),
                None,
                output.stderr.trim(),
            ));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn run_json<T: DeserializeOwned>(&self, args: &[&str], task: Option<&str>) -> Result<T> {
        let output = self.run_text(args, task).await?;
        serde_json::from_str(&output).map_err(|e| {
            Error::remote(
                format!("{} {}", self.binary, args.join(" ")),
                None,
                format!("returned invalid JSON ({e}). Output: {output}"),
            )
        })
    }
}

#[async_trait]
impl CloudTaskClient for CliCloudClient {
    async fn list(&self) -> Result<Vec<TaskInfo>> {
        self.run_json(&["list", "--json"], None).await
    }

    async fn show(&self, id: &str) -> Result<TaskDetail> {
        self.run_json(&["show", id, "--json"], Some(id)).await
    }

    async fn diff(&self, id: &str) -> Result<String> {
        self.run_text(&["diff", id], Some(id)).await
    }

    async fn apply(&self, id: &str, options: &ApplyOptions) -> Result<ApplyOutcome> {
        let mut args = vec!["apply", id];
        if let Some(branch) = &options.branch {
            args.extend(["--branch", branch.as_str()]);
        }
        if options.three_way {
            args.push("--three-way");
        }
        args.push("--json");
        self.run_json(&args, Some(id)).await
    }

    async fn is_available(&self) -> Result<bool> {
        self.list().await.map(|_| true)
    }
}
