//! Common test utilities

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use anyhow::{Context, Result};
use engine_bridge::{BridgeConfig, ExecutionBridge};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// A bridge whose "engine" is an inline shell script
///
/// Request arguments land in `$0`, `$1`, ... of the script.
pub fn scripted_engine(script: &str) -> ExecutionBridge {
    ExecutionBridge::new(
        BridgeConfig::new("sh")
            .with_base_args(["-c", script])
            .with_label("fake exec"),
    )
}

/// Write an executable shell script
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).context("Failed to write script")?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .context("Failed to make script executable")?;
    Ok(path)
}

/// Whether a process with this pid still exists
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid;

    signal::kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Wait up to five seconds for a process to disappear
///
/// Killed children are reaped in the background, so this polls.
#[cfg(unix)]
pub async fn wait_until_gone(pid: u32) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        smol::Timer::after(Duration::from_millis(50)).await;
    }
    !is_alive(pid)
}

/// A request captured by [`OneShotServer`]
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request line, e.g. `GET /api/tasks HTTP/1.1`
    pub request_line: String,
    /// Header block, lowercased
    pub headers: String,
    /// Request body
    pub body: String,
}

/// HTTP server that answers exactly one request with a canned response
pub struct OneShotServer {
    addr: SocketAddr,
    captured: mpsc::Receiver<CapturedRequest>,
}

impl OneShotServer {
    /// Start serving `body` with the given status line, e.g. `200 OK`
    pub fn start(status: &str, content_type: &str, body: &str) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").context("Failed to bind test server")?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();
        let response = format!(
            "HTTP/1.1 {status}\r\n\
             Content-Type: {content_type}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );

        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            if let Some(request) = read_request(&mut stream) {
                let _ = tx.send(request);
            }
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });

        Ok(Self { addr, captured: rx })
    }

    /// Base URL with an `/api` prefix
    pub fn endpoint(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// The request the server received
    pub fn request(&self) -> CapturedRequest {
        self.captured
            .recv_timeout(Duration::from_secs(5))
            .expect("server received no request")
    }
}

fn read_request(stream: &mut std::net::TcpStream) -> Option<CapturedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let (request_line, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    let headers = headers.to_lowercase();

    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }

    Some(CapturedRequest {
        request_line: request_line.to_string(),
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}
