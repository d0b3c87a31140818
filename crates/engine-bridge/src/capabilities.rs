//! Capability probing from CLI help output

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use crate::command::Command;
use crate::error::Result;
use crate::launcher::LocalLauncher;

static BROWSER_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)cdp|chrome|browser").expect("valid regex"));
static MCP_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)mcp").expect("valid regex"));

/// Optional features an engine supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCapabilities {
    /// Browser / Chrome DevTools Protocol control
    pub supports_browser_control: bool,
    /// Model Context Protocol tools
    pub supports_mcp: bool,
    /// Cloud task access
    pub supports_cloud: bool,
}

/// Flags derived from help text alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HelpCapabilities {
    /// Help text mentions CDP, Chrome or a browser
    pub supports_browser_control: bool,
    /// Help text mentions MCP
    pub supports_mcp: bool,
}

/// Decides whether cloud tasks are reachable
///
/// Returning [`Error::BinaryNotFound`](crate::Error::BinaryNotFound) means
/// "no cloud"; any other error aborts the probe.
#[async_trait]
pub trait CloudDetector: Send + Sync {
    /// Report whether cloud tasks are available
    async fn detect(&self) -> Result<bool>;
}

/// How to probe an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Binary name or path
    pub binary: String,
    /// Arguments that print help text
    pub help_args: Vec<String>,
}

impl ProbeOptions {
    /// Probe `binary --help`
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            help_args: vec!["--help".to_string()],
        }
    }

    /// Use different help arguments
    pub fn with_help_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.help_args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Match help text against the known feature keywords
pub fn detect_capabilities_from_help(help: &str) -> HelpCapabilities {
    HelpCapabilities {
        supports_browser_control: BROWSER_HINT.is_match(help),
        supports_mcp: MCP_HINT.is_match(help),
    }
}

/// Run the help command and return its stdout
///
/// A missing binary yields empty text; the exit code is ignored.
pub async fn probe_cli_help(
    launcher: &LocalLauncher,
    binary: &str,
    help_args: &[String],
) -> Result<String> {
    let command = Command::builder(binary).args(help_args).build();
    match launcher.output(&command).await {
        Ok(output) => Ok(output.stdout),
        Err(err) if err.is_binary_not_found() => {
            debug!(binary, "help probe: binary not found");
            Ok(String::new())
        }
        Err(err) => Err(err),
    }
}

/// Probe help text and, optionally, cloud availability
pub async fn probe_engine_capabilities(
    launcher: &LocalLauncher,
    options: &ProbeOptions,
    detector: Option<&dyn CloudDetector>,
) -> Result<EngineCapabilities> {
    let help = probe_cli_help(launcher, &options.binary, &options.help_args).await?;
    let HelpCapabilities {
        supports_browser_control,
        supports_mcp,
    } = detect_capabilities_from_help(&help);

    let supports_cloud = match detector {
        Some(detector) => match detector.detect().await {
            Ok(available) => available,
            Err(err) if err.is_binary_not_found() => {
                debug!(error = %err, "cloud helper missing");
                false
            }
            Err(err) => return Err(err),
        },
        None => false,
    };

    Ok(EngineCapabilities {
        supports_browser_control,
        supports_mcp,
        supports_cloud,
    })
}
