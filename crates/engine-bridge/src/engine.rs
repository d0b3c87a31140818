//! Engine facade
//!
//! An [`Engine`] runs prompts, reports its capabilities and hands out a
//! cloud task client. [`CliEngine`] wraps an external CLI through the
//! [`ExecutionBridge`]; [`StubEngine`](crate::stub::StubEngine) answers in
//! process. [`engine_from_settings`] picks one.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tracing::info;

use crate::bridge::{BridgeConfig, ExecutionBridge};
use crate::capabilities::{EngineCapabilities, ProbeOptions, probe_engine_capabilities};
use crate::cloud::{ClientDetector, CloudTaskClient};
use crate::config::{CODE_ENGINE_BIN_ENV, CODEX_ENGINE_BIN_ENV, EngineKind, Settings};
use crate::error::Result;
use crate::event::ExecutionEvent;
use crate::launcher::LocalLauncher;
use crate::request::ExecutionRequest;
use crate::stub::StubEngine;

/// Boxed event stream returned by every engine
pub type EventStream = BoxStream<'static, Result<ExecutionEvent>>;

/// A coding engine
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short engine name
    fn name(&self) -> &str;

    /// Start a run; events arrive lazily in emission order
    fn exec(&self, request: &ExecutionRequest) -> Result<EventStream>;

    /// Probe optional features
    async fn capabilities(&self) -> Result<EngineCapabilities>;

    /// Cloud task client bound to this engine
    fn cloud(&self) -> &dyn CloudTaskClient;
}

/// Fixed facts about an engine CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProfile {
    /// Engine name
    pub name: &'static str,
    /// Variable overriding the binary
    pub binary_env: &'static str,
    /// Binary used when the variable is unset
    pub default_binary: &'static str,
    /// Arguments preceding every request
    pub base_args: &'static [&'static str],
    /// Hint shown when the binary is missing
    pub missing_cli_message: &'static str,
}

/// The `code` CLI
pub const CODE: EngineProfile = EngineProfile {
    name: "code",
    binary_env: CODE_ENGINE_BIN_ENV,
    default_binary: "code",
    base_args: &["exec", "--jsonl"],
    missing_cli_message: "The `code` CLI is not installed. Install it or set ADE_ENGINE=stub.",
};

/// The `codex` CLI
pub const CODEX: EngineProfile = EngineProfile {
    name: "codex",
    binary_env: CODEX_ENGINE_BIN_ENV,
    default_binary: "codex",
    base_args: &["exec", "--jsonl"],
    missing_cli_message: "The `codex` CLI is not installed. Install it or set ADE_ENGINE=stub.",
};

impl EngineProfile {
    /// Bridge configuration for `binary`
    pub fn bridge_config(&self, binary: impl Into<String>) -> BridgeConfig {
        BridgeConfig::new(binary)
            .with_base_args(self.base_args.iter().copied())
            .with_missing_cli_message(self.missing_cli_message)
            .with_label(format!("{} exec", self.name))
    }
}

/// Engine backed by an external CLI
pub struct CliEngine {
    name: &'static str,
    bridge: ExecutionBridge,
    probe: ProbeOptions,
    launcher: LocalLauncher,
    cloud: Arc<dyn CloudTaskClient>,
}

impl std::fmt::Debug for CliEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliEngine")
            .field("name", &self.name)
            .field("bridge", &self.bridge)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

impl CliEngine {
    /// Run `binary` as the engine described by `profile`
    pub fn new(
        profile: &EngineProfile,
        binary: impl Into<String>,
        cloud: Arc<dyn CloudTaskClient>,
    ) -> Self {
        let binary = binary.into();
        Self {
            name: profile.name,
            probe: ProbeOptions::new(binary.clone()),
            bridge: ExecutionBridge::new(profile.bridge_config(binary)),
            launcher: LocalLauncher,
            cloud,
        }
    }

    /// Override the arguments used to print help text
    pub fn with_help_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe = self.probe.with_help_args(args);
        self
    }

    /// The underlying bridge
    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }
}

#[async_trait]
impl Engine for CliEngine {
    fn name(&self) -> &str {
        self.name
    }

    fn exec(&self, request: &ExecutionRequest) -> Result<EventStream> {
        Ok(self.bridge.exec(request)?.boxed())
    }

    async fn capabilities(&self) -> Result<EngineCapabilities> {
        let detector = ClientDetector(self.cloud.as_ref());
        probe_engine_capabilities(&self.launcher, &self.probe, Some(&detector)).await
    }

    fn cloud(&self) -> &dyn CloudTaskClient {
        self.cloud.as_ref()
    }
}

/// Build the engine selected by `settings`
pub fn engine_from_settings(settings: &Settings) -> Result<Box<dyn Engine>> {
    let (profile, binary) = match settings.engine {
        EngineKind::Stub => {
            info!(engine = "stub", "selected engine");
            return Ok(Box::new(StubEngine::new()));
        }
        EngineKind::Code => (&CODE, &settings.code_bin),
        EngineKind::Codex => (&CODEX, &settings.codex_bin),
    };

    let backend = settings.cloud.engine_backend()?;
    info!(engine = profile.name, %binary, cloud = backend.name(), "selected engine");

    Ok(Box::new(
        CliEngine::new(profile, binary.clone(), backend.connect())
            .with_help_args(settings.help_args.iter().cloned()),
    ))
}

/// Build the engine selected by the process environment
pub fn engine_from_env() -> Result<Box<dyn Engine>> {
    engine_from_settings(&Settings::from_env()?)
}
