//! Stdin handling for processes
//!
//! Engines receive exactly one request on stdin, after which stdin is
//! closed. There is no interactive back-and-forth.

use futures::io::AsyncWriteExt;
use std::io;

/// Handle for writing the request payload to a process's stdin
pub struct StdinHandle {
    /// The actual stdin writer
    stdin: Option<async_process::ChildStdin>,
}

impl StdinHandle {
    /// Create a new stdin handle
    pub fn new(stdin: Option<async_process::ChildStdin>) -> Self {
        Self { stdin }
    }

    /// Write the payload, then close stdin
    ///
    /// A child that exits without reading its input produces a broken pipe;
    /// that is not an error here, the exit status tells the real story.
    pub async fn send_and_close(mut self, payload: &[u8]) -> io::Result<()> {
        let result = match &mut self.stdin {
            Some(stdin) => write_all_and_close(stdin, payload).await,
            None => Ok(()),
        };
        self.close();

        match result {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("stdin closed by child before request was fully written");
                Ok(())
            }
            other => other,
        }
    }

    /// Close stdin by dropping the writer
    pub fn close(&mut self) {
        self.stdin.take();
    }
}

async fn write_all_and_close(
    stdin: &mut async_process::ChildStdin,
    payload: &[u8],
) -> io::Result<()> {
    if !payload.is_empty() {
        stdin.write_all(payload).await?;
        stdin.flush().await?;
    }
    stdin.close().await
}
