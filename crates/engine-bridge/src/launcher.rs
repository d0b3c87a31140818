//! Local process launcher
//!
//! [`LocalLauncher`] starts a child with three independent pipes and hands
//! back its raw stdout, a control handle, and a completion future. The
//! completion future writes the request to stdin, collects stderr and
//! waits for the exit status; it must be polled alongside stdout so
//! neither pipe fills up.

use async_process::{Child, ChildStdout, Stdio};
use futures::future::{self, BoxFuture, FutureExt};
use futures::io::AsyncReadExt;
use std::io;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::process::{CapturedOutput, ExitStatus, ProcessOutcome};
use crate::stdin::StdinHandle;

/// Future resolving once the process has exited and stderr is drained
pub type Completion = BoxFuture<'static, Result<ProcessOutcome>>;

/// Launcher for executing processes locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLauncher;

/// A freshly spawned process
pub struct LaunchedProcess {
    /// Raw stdout of the child
    pub stdout: ChildStdout,
    /// Control handle; kills the child on drop unless disarmed
    pub handle: LocalProcessHandle,
    /// Stdin write, stderr collection and exit wait
    pub completion: Completion,
}

/// A handle to control a local process
pub struct LocalProcessHandle {
    /// The underlying child process
    child: Child,
    /// Whether to kill the process on drop
    kill_on_drop: bool,
}

impl LocalLauncher {
    /// Spawn `command` with piped stdin, stdout and stderr
    ///
    /// A missing binary is reported as [`Error::BinaryNotFound`]; every
    /// other spawn failure is [`Error::SpawnFailed`].
    pub fn launch(&self, command: &Command) -> Result<LaunchedProcess> {
        let mut async_cmd = command.prepare();

        let payload = command.get_stdin_payload().map(<[u8]>::to_vec);
        async_cmd.stdin(if payload.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        async_cmd.stdout(Stdio::piped());
        async_cmd.stderr(Stdio::piped());

        let mut child = async_cmd.spawn().map_err(|e| spawn_error(command, e))?;
        debug!(pid = child.id(), command = %command.display(), "spawned process");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::spawn_failed("stdout was not captured"))?;
        let stdin = StdinHandle::new(child.stdin.take());
        let stderr = child.stderr.take();
        let status = child.status();
        let pid = child.id();

        let completion = async move {
            let write = stdin.send_and_close(payload.as_deref().unwrap_or_default());
            let (written, diagnostics) = future::join(write, read_lossy(stderr)).await;
            if let Err(err) = written {
                warn!(pid, error = %err, "failed to write request to stdin");
            }

            let status = ExitStatus::from(status.await?);
            debug!(pid, code = ?status.code, signal = ?status.signal, "process exited");
            Ok(ProcessOutcome {
                status,
                diagnostics: diagnostics?,
            })
        }
        .boxed();

        let handle = LocalProcessHandle {
            child,
            kill_on_drop: true,
        };

        Ok(LaunchedProcess {
            stdout,
            handle,
            completion,
        })
    }

    /// Run `command` to completion and capture its output
    pub async fn output(&self, command: &Command) -> Result<CapturedOutput> {
        let LaunchedProcess {
            stdout,
            mut handle,
            completion,
        } = self.launch(command)?;

        let (stdout, outcome) = future::join(read_lossy(Some(stdout)), completion).await;
        handle.disarm();
        let outcome = outcome?;

        Ok(CapturedOutput {
            status: outcome.status,
            stdout: stdout?,
            stderr: outcome.diagnostics,
        })
    }
}

impl LocalProcessHandle {
    /// Get the process ID
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Forcefully stop the process
    pub fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .map_err(|e| Error::signal_failed(9, e.to_string()))
    }

    /// Ask the process to shut down (SIGTERM on Unix, kill elsewhere)
    pub fn terminate(&mut self) -> Result<()> {
        // Never signal a pid that has already been reaped.
        if self.child.try_status()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            signal::kill(pid, Signal::SIGTERM)
                .map_err(|e| Error::signal_failed(15, e.to_string()))?;
        }

        #[cfg(not(unix))]
        {
            self.kill()?;
        }

        Ok(())
    }

    /// Stop killing the process on drop; used once it has exited
    pub fn disarm(&mut self) {
        self.kill_on_drop = false;
    }
}

impl Drop for LocalProcessHandle {
    fn drop(&mut self) {
        if self.kill_on_drop {
            debug!(pid = self.child.id(), "killing process on drop");
            let _ = self.child.kill();
        }
    }
}

fn spawn_error(command: &Command, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        // A missing working directory surfaces as NotFound as well.
        if let Some(dir) = command.get_current_dir().filter(|dir| !dir.is_dir()) {
            return Error::spawn_failed(format!(
                "working directory {} does not exist",
                dir.display()
            ));
        }
        return Error::binary_not_found(command.get_program().to_string_lossy());
    }
    Error::spawn_failed(format!("failed to spawn `{}`: {err}", command.display()))
}

async fn read_lossy<R>(reader: Option<R>) -> io::Result<String>
where
    R: futures::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_distinguished() {
        let cmd = Command::new("this_command_does_not_exist_12345");
        let err = LocalLauncher.launch(&cmd).err().unwrap();
        assert!(err.is_binary_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn missing_working_directory_is_not_a_missing_binary() {
        let cmd = Command::builder("sh")
            .current_dir("/this/dir/does/not/exist/12345")
            .build();
        let err = LocalLauncher.launch(&cmd).err().unwrap();
        assert!(matches!(err, Error::SpawnFailed { .. }), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn output_captures_both_streams_and_stdin() {
        futures::executor::block_on(async {
            let cmd = Command::builder("sh")
                .arg("-c")
                .arg("cat; echo oops >&2; exit 3")
                .stdin_payload("ping")
                .build();

            let output = LocalLauncher.output(&cmd).await.unwrap();
            assert_eq!(output.stdout, "ping");
            assert_eq!(output.stderr.trim(), "oops");
            assert_eq!(output.status.code, Some(3));
        });
    }

    #[cfg(unix)]
    #[test]
    fn env_overrides_and_removals_apply() {
        futures::executor::block_on(async {
            let cmd = Command::builder("sh")
                .arg("-c")
                .arg("echo \"${ADDED:-unset}/${REMOVED:-unset}\"")
                .env("ADDED", "yes")
                .env("REMOVED", "present")
                .env_remove("REMOVED")
                .build();

            let output = LocalLauncher.output(&cmd).await.unwrap();
            assert_eq!(output.stdout.trim(), "yes/unset");
            assert!(output.status.success());
        });
    }

    #[cfg(unix)]
    #[test]
    fn terminate_stops_a_running_process() {
        futures::executor::block_on(async {
            let cmd = Command::builder("sleep").arg("30").build();
            let mut launched = LocalLauncher.launch(&cmd).unwrap();

            launched.handle.terminate().unwrap();
            let outcome = launched.completion.await.unwrap();
            assert_eq!(outcome.status.signal, Some(15));
            assert!(!outcome.status.success());
        });
    }
}
