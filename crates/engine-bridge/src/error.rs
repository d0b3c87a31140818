//! Error types for engine execution

use thiserror::Error;

use crate::jsonl::DecodeError;

/// Unified error type for engine execution, probing and cloud calls
#[derive(Error, Debug)]
pub enum Error {
    /// The engine (or helper) binary is not installed or not on `PATH`
    ///
    /// The display text is the remediation hint and is meant to be shown
    /// to users verbatim.
    #[error("{hint}")]
    BinaryNotFound {
        /// The binary that could not be resolved
        binary: String,
        /// Actionable message explaining how to fix the problem
        hint: String,
    },

    /// The process ran but exited unsuccessfully
    #[error("{command} exited with {}: {diagnostics}", describe_exit(.code, .signal))]
    NonZeroExit {
        /// Label of the command that failed
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Signal that terminated the process (Unix only)
        signal: Option<i32>,
        /// Everything the process wrote to stderr
        diagnostics: String,
    },

    /// A line of process output was not valid JSON
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A remote task backend (HTTP or companion CLI) reported a failure
    #[error("{operation} failed: {reason}")]
    RemoteRequest {
        /// What was being attempted, e.g. `show task abc`
        operation: String,
        /// HTTP status, when the backend speaks HTTP
        status: Option<u16>,
        /// Status text, stderr, or transport error
        reason: String,
    },

    /// A cloud task does not exist
    #[error("task not found: {id}")]
    NotFound {
        /// The requested task id
        id: String,
    },

    /// Failed to spawn a process for a reason other than a missing binary
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// Failed to send signal to process
    #[error("failed to send signal {signal}: {reason}")]
    SignalFailed {
        /// The signal number that failed to send
        signal: i32,
        /// The reason for the signal failure
        reason: String,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error outside of line decoding
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("code {code}"),
        (None, Some(signal)) => format!("signal {signal}"),
        (None, None) => "unknown status".to_string(),
    }
}

impl Error {
    /// Create a binary-not-found error with the default hint
    pub fn binary_not_found(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        Self::BinaryNotFound {
            hint: format!("The `{binary}` CLI is not installed or not found in PATH."),
            binary,
        }
    }

    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Create a signal failed error
    pub fn signal_failed(signal: i32, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            signal,
            reason: reason.into(),
        }
    }

    /// Create a remote request error
    pub fn remote(
        operation: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::RemoteRequest {
            operation: operation.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Replace the remediation hint of a [`Error::BinaryNotFound`]
    ///
    /// Other variants are returned unchanged.
    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            Error::BinaryNotFound { binary, .. } => Error::BinaryNotFound {
                binary,
                hint: hint.into(),
            },
            other => other,
        }
    }

    /// Returns true if this error means the tool is not installed
    pub fn is_binary_not_found(&self) -> bool {
        matches!(self, Error::BinaryNotFound { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
