//! Cloudflare quick-tunnel supervision
//!
//! Spawns `cloudflared tunnel --url <local> --no-autoupdate`, watches its
//! stderr for the `trycloudflare.com` endpoint and hands back a
//! [`TunnelHandle`] that owns the subprocess.
//!
//! ```text
//! Resolving -> Starting -> AwaitingUrl -> Running -> Closed
//!     \            \            \
//!      +------------+------------+--> Failed
//! ```

use super::pattern::extract_public_url;
use crate::binary::BinaryResolver;
use crate::{Error, Result};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default tunnel executable
pub const CLOUDFLARED: &str = "cloudflared";

/// How long cloudflared gets to report its public URL by default
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

const OUTPUT_TARGET: &str = "gallery_tunnel::tunnel::output";

/// Lifecycle of a tunnel subprocess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Resolving,
    Starting,
    AwaitingUrl,
    Running,
    Closed,
    Failed,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Starting => "starting",
            Self::AwaitingUrl => "awaiting-url",
            Self::Running => "running",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Starts tunnel subprocesses and waits for their public endpoint
#[derive(Debug, Clone)]
pub struct TunnelSupervisor {
    resolver: BinaryResolver,
    binary: String,
    startup_timeout: Duration,
}

impl Default for TunnelSupervisor {
    fn default() -> Self {
        Self::new(BinaryResolver::new())
    }
}

impl TunnelSupervisor {
    pub fn new(resolver: BinaryResolver) -> Self {
        Self {
            resolver,
            binary: CLOUDFLARED.to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    pub fn from_settings(resolver: BinaryResolver, settings: &crate::config::TunnelSettings) -> Self {
        Self::new(resolver)
            .with_binary(&settings.binary)
            .with_startup_timeout(settings.startup_timeout())
    }

    /// Use a differently named tunnel executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Start a tunnel forwarding to `local_url` and wait for its public URL.
    ///
    /// Fails with [`Error::TunnelUrlTimeout`] when no endpoint shows up
    /// within the startup timeout and with [`Error::ProcessCancelled`] when
    /// `cancel` fires first. If cloudflared closes stderr before printing an
    /// endpoint the call fails at once with [`Error::TunnelExited`] instead of
    /// idling until the deadline. The subprocess is killed and reaped on every
    /// failure path.
    pub async fn start(&self, local_url: &str, cancel: &CancellationToken) -> Result<TunnelHandle> {
        url::Url::parse(local_url)
            .map_err(|e| Error::config(format!("Invalid local URL {:?}: {}", local_url, e)))?;

        self.transition(TunnelState::Resolving);
        let resolved = self
            .resolver
            .resolve(&self.binary)
            .inspect_err(|_| self.transition(TunnelState::Failed))?;

        self.transition(TunnelState::Starting);
        let mut cmd = Command::new(&resolved.executable_path);
        cmd.args(["tunnel", "--url", local_url, "--no-autoupdate"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &resolved.search_directory {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            self.transition(TunnelState::Failed);
            Error::process_start(&self.binary, e)
        })?;
        tracing::info!(
            "Started {} (pid {:?}) forwarding {}",
            self.binary,
            child.id(),
            local_url
        );

        let stderr = match child.stderr.take() {
            Some(stderr) => stderr,
            None => {
                terminate(&mut child).await;
                self.transition(TunnelState::Failed);
                return Err(Error::internal(format!(
                    "Failed to capture {} stderr",
                    self.binary
                )));
            }
        };

        self.transition(TunnelState::AwaitingUrl);
        let mut lines = OutputLines::new(stderr);
        let deadline = Instant::now() + self.startup_timeout;

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    break Err(Error::ProcessCancelled { name: self.binary.clone() });
                }
                _ = tokio::time::sleep_until(deadline) => {
                    break Err(Error::TunnelUrlTimeout {
                        name: self.binary.clone(),
                        timeout: self.startup_timeout,
                    });
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        tracing::debug!(target: OUTPUT_TARGET, "{}", line);
                        if let Some(url) = extract_public_url(&line) {
                            break Ok(url.to_string());
                        }
                    }
                    Ok(None) => break Err(Error::TunnelExited { name: self.binary.clone() }),
                    Err(e) => break Err(Error::Io(e)),
                },
            }
        };

        match outcome {
            Ok(public_url) => {
                self.transition(TunnelState::Running);
                tracing::info!("Tunnel active: {}", public_url);
                Ok(TunnelHandle {
                    child: Some(child),
                    public_url,
                    drain: Some(tokio::spawn(drain_output(lines))),
                    state: TunnelState::Running,
                })
            }
            Err(e) => {
                terminate(&mut child).await;
                self.transition(TunnelState::Failed);
                if e.is_cancelled() {
                    tracing::info!("{}", e);
                } else {
                    tracing::warn!("{}", e);
                }
                Err(e)
            }
        }
    }

    fn transition(&self, state: TunnelState) {
        tracing::debug!("{} tunnel -> {}", self.binary, state);
    }
}

/// A running tunnel subprocess and the public URL it reported.
///
/// Only produced by a successful [`TunnelSupervisor::start`]. Dropping the
/// handle kills the process; [`TunnelHandle::close`] also reaps it.
#[derive(Debug)]
pub struct TunnelHandle {
    child: Option<Child>,
    public_url: String,
    drain: Option<JoinHandle<()>>,
    state: TunnelState,
}

impl TunnelHandle {
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// OS process id, `None` once closed or reaped
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn state(&self) -> TunnelState {
        self.state
    }

    /// Whether the subprocess is still alive
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Resolves once the subprocess exits without being asked to.
    ///
    /// Never resolves after [`TunnelHandle::close`].
    pub async fn exited(&mut self) -> std::io::Result<std::process::ExitStatus> {
        match self.child.as_mut() {
            Some(child) => {
                let status = child.wait().await?;
                tracing::warn!("Tunnel {} exited: {}", self.public_url, status);
                self.state = TunnelState::Failed;
                Ok(status)
            }
            None => std::future::pending().await,
        }
    }

    /// Kill and reap the subprocess. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("Stopping tunnel {}", self.public_url);
            terminate(&mut child).await;
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        self.state = TunnelState::Closed;
    }
}

impl Drop for TunnelHandle {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            tracing::warn!("TunnelHandle dropped while still running, killing child process");
            let _ = child.start_kill();
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}

/// Best-effort kill; an already exited process is not an error
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!("kill failed (process likely exited): {}", e);
    }
    let _ = child.wait().await;
}

/// Keep reading stderr after startup so cloudflared never blocks on a full pipe
async fn drain_output(mut lines: OutputLines) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::debug!(target: OUTPUT_TARGET, "{}", line),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Stopped reading tunnel output: {}", e);
                break;
            }
        }
    }
}

/// Newline-delimited reader over the tunnel's stderr.
///
/// cloudflared output is not guaranteed to be UTF-8, so lines are split on
/// raw bytes and decoded lossily. `next_line` is cancel-safe: a partially read
/// line stays buffered until the next call.
#[derive(Debug)]
struct OutputLines {
    reader: BufReader<ChildStderr>,
    buf: Vec<u8>,
}

impl OutputLines {
    fn new(stderr: ChildStderr) -> Self {
        Self {
            reader: BufReader::new(stderr),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.reader.read_until(b'\n', &mut self.buf).await?;
        if self.buf.is_empty() {
            return Ok(None);
        }
        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

/// Strip the line terminator and replace invalid UTF-8
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
