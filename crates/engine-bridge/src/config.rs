//! Engine and cloud settings
//!
//! Settings come from environment variables ([`Settings::from_env`]) or a
//! YAML file ([`Settings::from_file`]). Every field has a default, so an
//! empty environment selects the stub engine and the fixture cloud.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::cloud::CloudBackend;
use crate::cloud::cli::DEFAULT_CLOUD_BIN;
use crate::error::{Error, Result};

/// Selects the engine implementation
pub const ENGINE_ENV: &str = "ADE_ENGINE";
/// Overrides the `code` engine binary
pub const CODE_ENGINE_BIN_ENV: &str = "CODE_ENGINE_BIN";
/// Overrides the `codex` engine binary
pub const CODEX_ENGINE_BIN_ENV: &str = "CODEX_ENGINE_BIN";
/// Forces a cloud backend (`http`, `cli` or `fixture`)
pub const CLOUD_BACKEND_ENV: &str = "ADE_CLOUD_BACKEND";
/// Remote task API base URL
pub const CLOUD_ENDPOINT_ENV: &str = "ADE_CLOUD_ENDPOINT";
/// Remote task API bearer key
pub const CLOUD_API_KEY_ENV: &str = "ADE_CLOUD_API_KEY";
/// Overrides the companion cloud binary
pub const CLOUD_BIN_ENV: &str = "ADE_CLOUD_BIN";
/// Overrides the fixture directory
pub const CLOUD_FIXTURES_ENV: &str = "ADE_CLOUD_FIXTURES";

/// Fixtures bundled with this crate
pub fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

/// Which engine to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// The `code` CLI
    Code,
    /// The `codex` CLI
    Codex,
    /// In-process stub
    #[default]
    Stub,
}

impl EngineKind {
    /// Parse an engine name; anything unrecognized selects the stub
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "code" => EngineKind::Code,
            "codex" => EngineKind::Codex,
            "stub" | "" => EngineKind::Stub,
            other => {
                debug!(engine = other, "unknown engine, using stub");
                EngineKind::Stub
            }
        }
    }
}

/// Cloud backend names accepted in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudBackendKind {
    /// Remote HTTP API
    Http,
    /// Companion CLI
    Cli,
    /// Local fixtures
    Fixture,
}

impl FromStr for CloudBackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(CloudBackendKind::Http),
            "cli" => Ok(CloudBackendKind::Cli),
            "fixture" | "fixtures" => Ok(CloudBackendKind::Fixture),
            other => Err(Error::Config(format!(
                "unknown cloud backend `{other}` (expected http, cli or fixture)"
            ))),
        }
    }
}

/// Cloud task settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    /// Backend used by engines; defaults to the companion CLI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<CloudBackendKind>,
    /// Remote API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Remote API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Companion binary
    pub cli_bin: String,
    /// Fixture directory
    pub fixtures_dir: PathBuf,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            backend: None,
            endpoint: None,
            api_key: None,
            cli_bin: DEFAULT_CLOUD_BIN.to_string(),
            fixtures_dir: default_fixtures_dir(),
        }
    }
}

impl CloudSettings {
    fn http(&self) -> Option<CloudBackend> {
        match (&self.endpoint, &self.api_key) {
            (Some(endpoint), Some(api_key)) => Some(CloudBackend::Http {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
            }),
            _ => None,
        }
    }

    fn fixture(&self) -> CloudBackend {
        CloudBackend::Fixture {
            dir: self.fixtures_dir.clone(),
        }
    }

    /// Backend for talking to the cloud directly
    ///
    /// HTTP when both endpoint and key are set, otherwise fixtures. Never
    /// the companion CLI, which itself uses this selection.
    pub fn direct_backend(&self) -> CloudBackend {
        self.http().unwrap_or_else(|| self.fixture())
    }

    /// Backend used by engine facades
    pub fn engine_backend(&self) -> Result<CloudBackend> {
        match self.backend.unwrap_or(CloudBackendKind::Cli) {
            CloudBackendKind::Cli => Ok(CloudBackend::Cli {
                binary: self.cli_bin.clone(),
            }),
            CloudBackendKind::Fixture => Ok(self.fixture()),
            CloudBackendKind::Http => self.http().ok_or_else(|| {
                Error::Config(format!(
                    "http cloud backend needs both {CLOUD_ENDPOINT_ENV} and {CLOUD_API_KEY_ENV}"
                ))
            }),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine to run
    pub engine: EngineKind,
    /// `code` engine binary
    pub code_bin: String,
    /// `codex` engine binary
    pub codex_bin: String,
    /// Arguments that make an engine print its help text
    pub help_args: Vec<String>,
    /// Cloud task settings
    pub cloud: CloudSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineKind::Stub,
            code_bin: "code".to_string(),
            codex_bin: "codex".to_string(),
            help_args: vec!["--help".to_string()],
            cloud: CloudSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Read settings from an explicit set of variables
    ///
    /// Empty values count as unset.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        let mut settings = Settings::default();
        if let Some(engine) = vars.get(ENGINE_ENV) {
            settings.engine = EngineKind::from_name(engine);
        }
        if let Some(bin) = vars.get(CODE_ENGINE_BIN_ENV) {
            settings.code_bin = bin.clone();
        }
        if let Some(bin) = vars.get(CODEX_ENGINE_BIN_ENV) {
            settings.codex_bin = bin.clone();
        }

        let cloud = &mut settings.cloud;
        if let Some(backend) = vars.get(CLOUD_BACKEND_ENV) {
            cloud.backend = Some(backend.parse()?);
        }
        cloud.endpoint = vars.get(CLOUD_ENDPOINT_ENV).cloned();
        cloud.api_key = vars.get(CLOUD_API_KEY_ENV).cloned();
        if let Some(bin) = vars.get(CLOUD_BIN_ENV) {
            cloud.cli_bin = bin.clone();
        }
        if let Some(dir) = vars.get(CLOUD_FIXTURES_ENV) {
            cloud.fixtures_dir = PathBuf::from(dir);
        }

        Ok(settings)
    }

    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("failed to parse YAML: {e}")))
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml_str(&contents)
    }
}
