//! Engine execution bridge
//!
//! Runs command-line AI coding engines as child processes and exposes
//! their newline-delimited JSON output as a lazy stream of typed
//! [`ExecutionEvent`]s. Also probes engine capabilities and gives uniform
//! access to remote "cloud tasks" over HTTP, a companion CLI or local
//! fixtures.
//!
//! The library is runtime-agnostic: streams and futures can be driven by
//! any executor.
//!
//! ```no_run
//! use engine_bridge::{ExecutionRequest, engine_from_env};
//! use futures::StreamExt;
//!
//! # fn main() -> engine_bridge::Result<()> {
//! futures::executor::block_on(async {
//!     let engine = engine_from_env()?;
//!     let mut events = engine.exec(&ExecutionRequest::new("Summarize README.md"))?;
//!     while let Some(event) = events.next().await {
//!         println!("{:?}", event?);
//!     }
//!     Ok::<_, engine_bridge::Error>(())
//! })
//! # }
//! ```

#![warn(missing_docs)]

pub mod bridge;
pub mod capabilities;
pub mod cloud;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod jsonl;
pub mod launcher;
pub mod process;
pub mod request;
pub mod stdin;
pub mod stub;

pub use bridge::{BridgeConfig, ExecStream, ExecutionBridge};
pub use capabilities::{
    CloudDetector, EngineCapabilities, HelpCapabilities, ProbeOptions,
    detect_capabilities_from_help, probe_cli_help, probe_engine_capabilities,
};
pub use cloud::{
    ApplyOptions, ApplyOutcome, CliCloudClient, CloudBackend, CloudTaskClient, ConversationTurn,
    FixtureCloudClient, HttpCloudClient, TaskDetail, TaskInfo,
};
pub use command::Command;
pub use config::{CloudSettings, EngineKind, Settings};
pub use engine::{
    CODE, CODEX, CliEngine, Engine, EngineProfile, EventStream, engine_from_env,
    engine_from_settings,
};
pub use error::{Error, Result};
pub use event::{EventTimestamp, ExecutionEvent};
pub use jsonl::{DecodeError, JsonlDecoder};
pub use launcher::LocalLauncher;
pub use process::{CapturedOutput, ExitStatus};
pub use request::ExecutionRequest;
pub use stub::{StubCloudClient, StubEngine};
