//! Fixture-backed task client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ApplyOptions, ApplyOutcome, CloudTaskClient, TaskDetail, TaskInfo};
use crate::error::{Error, Result};

/// Reads tasks from `tasks.json` and `<id>.json` in a directory
///
/// Nothing is ever written; `apply` only reports what would happen.
#[derive(Debug, Clone)]
pub struct FixtureCloudClient {
    dir: PathBuf,
}

impl FixtureCloudClient {
    /// Serve fixtures from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The fixture directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> io::Result<T> {
        let path = self.dir.join(name);
        debug!(path = %path.display(), "reading cloud fixture");
        let data = async_fs::read_to_string(&path).await?;
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    async fn read_detail(&self, id: &str) -> Result<TaskDetail> {
        if !is_safe_id(id) {
            return Err(Error::NotFound { id: id.to_string() });
        }
        match self.read_json(&format!("{id}.json")).await {
            Ok(detail) => Ok(detail),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(Error::NotFound { id: id.to_string() })
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Ids become file names, so anything that could escape the directory is rejected
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id != "tasks" && !id.contains(['/', '\\']) && !id.starts_with('.')
}

#[async_trait]
impl CloudTaskClient for FixtureCloudClient {
    async fn list(&self) -> Result<Vec<TaskInfo>> {
        Ok(self.read_json("tasks.json").await?)
    }

    async fn show(&self, id: &str) -> Result<TaskDetail> {
        self.read_detail(id).await
    }

    async fn diff(&self, id: &str) -> Result<String> {
        Ok(self.read_detail(id).await?.diff.unwrap_or_default())
    }

    async fn apply(&self, id: &str, options: &ApplyOptions) -> Result<ApplyOutcome> {
        Ok(ApplyOutcome {
            branch: options
                .branch
                .clone()
                .unwrap_or_else(|| format!("fixture/{id}")),
            applied: true,
            message: Some("Fixture apply completed.".to_string()),
        })
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(false)
    }
}
