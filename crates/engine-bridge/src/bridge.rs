//! Execution bridge: engine process → stream of [`ExecutionEvent`]s
//!
//! [`ExecutionBridge::exec`] spawns the engine and returns an [`ExecStream`].
//! Each poll drives the process completion (stdin write, stderr
//! collection, exit wait), yields already-decoded events, and reads more
//! stdout when the queue is empty. The exit status is only inspected after
//! stdout has been fully drained.

use async_process::ChildStdout;
use futures::io::AsyncRead;
use futures::stream::{FusedStream, Stream};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::event::ExecutionEvent;
use crate::jsonl::JsonlDecoder;
use crate::launcher::{Completion, LaunchedProcess, LocalLauncher, LocalProcessHandle};
use crate::process::ProcessOutcome;
use crate::request::ExecutionRequest;

const READ_CHUNK: usize = 8 * 1024;

/// Static description of one engine CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Binary name or path
    pub binary: String,
    /// Arguments placed before the request's own arguments
    pub base_args: Vec<String>,
    /// Hint shown when the binary is missing
    pub missing_cli_message: String,
    /// Name used in error messages, e.g. `codex exec`
    pub label: String,
}

impl BridgeConfig {
    /// Create a config for `binary` with no fixed arguments
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        Self {
            missing_cli_message: format!(
                "The `{binary}` CLI is not installed or not found in PATH."
            ),
            label: binary.clone(),
            binary,
            base_args: Vec::new(),
        }
    }

    /// Set the fixed leading arguments
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the hint shown when the binary is missing
    pub fn with_missing_cli_message(mut self, message: impl Into<String>) -> Self {
        self.missing_cli_message = message.into();
        self
    }

    /// Set the label used in error messages
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Spawns an engine per request and streams its events
#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    config: BridgeConfig,
    launcher: LocalLauncher,
}

impl ExecutionBridge {
    /// Create a bridge for the given engine
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            launcher: LocalLauncher,
        }
    }

    /// The engine description
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Build the command that [`exec`](Self::exec) would spawn
    pub fn command_for(&self, request: &ExecutionRequest) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .args(&self.config.base_args)
            .args(&request.args)
            .stdin_payload(request.prompt.as_bytes());

        if let Some(dir) = &request.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &request.env {
            match value {
                Some(value) => command.env(key, value),
                None => command.env_remove(key),
            };
        }
        command
    }

    /// Spawn the engine for `request`
    ///
    /// A missing binary fails here, before any event exists.
    pub fn exec(&self, request: &ExecutionRequest) -> Result<ExecStream> {
        let command = self.command_for(request);
        let launched = self
            .launcher
            .launch(&command)
            .map_err(|e| e.with_hint(&self.config.missing_cli_message))?;
        Ok(ExecStream::new(self.config.label.clone(), launched))
    }
}

/// Lazily produced events of one engine run
///
/// Dropping the stream before it finishes kills the engine process.
pub struct ExecStream {
    label: String,
    stdout: Option<ChildStdout>,
    read_buf: Vec<u8>,
    decoder: JsonlDecoder<ExecutionEvent>,
    queue: VecDeque<ExecutionEvent>,
    handle: LocalProcessHandle,
    completion: Option<Completion>,
    outcome: Option<Result<ProcessOutcome>>,
    failure: Option<Error>,
    done: bool,
}

impl ExecStream {
    fn new(label: String, launched: LaunchedProcess) -> Self {
        Self {
            label,
            stdout: Some(launched.stdout),
            read_buf: vec![0; READ_CHUNK],
            decoder: JsonlDecoder::new(),
            queue: VecDeque::new(),
            handle: launched.handle,
            completion: Some(launched.completion),
            outcome: None,
            failure: None,
            done: false,
        }
    }

    /// Process id of the engine
    pub fn pid(&self) -> u32 {
        self.handle.pid()
    }

    /// Kill the engine and end the stream
    pub fn cancel(&mut self) -> Result<()> {
        if self.done || self.outcome.is_some() {
            self.done = true;
            return Ok(());
        }
        debug!(pid = self.pid(), label = %self.label, "cancelling engine run");
        self.done = true;
        self.stdout = None;
        self.queue.clear();
        self.handle.kill()
    }

    /// Ask the engine to stop (SIGTERM on Unix) and keep streaming
    ///
    /// Events the engine prints while shutting down are still yielded; the
    /// stream ends with the engine's own exit status.
    pub fn terminate(&mut self) -> Result<()> {
        if self.done || self.outcome.is_some() {
            return Ok(());
        }
        debug!(pid = self.pid(), label = %self.label, "terminating engine run");
        self.handle.terminate()
    }

    fn poll_completion(&mut self, cx: &mut Context<'_>) {
        if let Some(completion) = &mut self.completion {
            if let Poll::Ready(outcome) = completion.as_mut().poll(cx) {
                self.completion = None;
                self.handle.disarm();
                self.outcome = Some(outcome);
            }
        }
    }

    /// Stop reading, kill the engine and remember why
    fn abort(&mut self, err: Error) {
        warn!(pid = self.pid(), label = %self.label, error = %err, "aborting engine run");
        self.stdout = None;
        if self.outcome.is_none() {
            if let Err(kill_err) = self.handle.kill() {
                debug!(error = %kill_err, "kill after abort failed");
            }
        }
        self.failure = Some(err);
    }

    fn finish(&mut self, outcome: Result<ProcessOutcome>) -> Option<Result<ExecutionEvent>> {
        self.done = true;

        // The original failure wins over whatever the killed process reports.
        if let Some(err) = self.failure.take() {
            return Some(Err(err));
        }

        match outcome {
            Ok(outcome) if outcome.status.success() => None,
            Ok(outcome) => Some(Err(Error::NonZeroExit {
                command: self.label.clone(),
                code: outcome.status.code,
                signal: outcome.status.signal,
                diagnostics: outcome.diagnostics,
            })),
            Err(err) => Some(Err(err)),
        }
    }
}

impl Stream for ExecStream {
    type Item = Result<ExecutionEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            this.poll_completion(cx);

            if let Some(event) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let Some(stdout) = &mut this.stdout else {
                return match this.outcome.take() {
                    Some(outcome) => Poll::Ready(this.finish(outcome)),
                    // Completion was polled above, so its waker is registered.
                    None => Poll::Pending,
                };
            };

            match Pin::new(stdout).poll_read(cx, &mut this.read_buf) {
                Poll::Ready(Ok(0)) => {
                    this.stdout = None;
                    let queue = &mut this.queue;
                    if let Err(err) = this.decoder.flush(|event| queue.push_back(event)) {
                        this.abort(err.into());
                    }
                }
                Poll::Ready(Ok(n)) => {
                    let queue = &mut this.queue;
                    let chunk = &this.read_buf[..n];
                    if let Err(err) = this.decoder.feed(chunk, |event| queue.push_back(event)) {
                        this.abort(err.into());
                    }
                }
                Poll::Ready(Err(err)) => this.abort(err.into()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl FusedStream for ExecStream {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
