//! Error type definitions
//!
//! Defines the error taxonomy shared by binary resolution, port readiness,
//! media probing and tunnel supervision.

use std::time::Duration;
use thiserror::Error;

/// Main error type for the orchestration subsystem
#[derive(Error, Debug)]
pub enum Error {
    /// Executable missing from both the bundle directory and `PATH`
    #[error("{name} not found; install via: {hint}")]
    BinaryNotFound { name: String, hint: String },

    /// The OS refused to spawn the process
    #[error("Failed to start {name}: {source}")]
    ProcessStartFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// No public endpoint appeared in the tunnel output before the deadline
    #[error("Timed out after {timeout:?} waiting for {name} tunnel URL")]
    TunnelUrlTimeout { name: String, timeout: Duration },

    /// The tunnel closed its diagnostic stream without reporting an endpoint
    #[error("{name} exited before reporting a tunnel URL")]
    TunnelExited { name: String },

    /// Caller cancelled the operation before it completed
    #[error("{name} startup cancelled")]
    ProcessCancelled { name: String },

    /// Probe exited non-zero
    #[error("{tool} failed: {detail}")]
    ProbeExecutionFailed { tool: String, detail: String },

    /// Probe exited zero but printed something that is not a number
    #[error("{tool} returned invalid duration: {output:?}")]
    ProbeOutputInvalid { tool: String, output: String },

    /// Local listener never accepted a connection
    #[error("Timed out after {timeout:?} waiting for {addr} to accept connections")]
    PortNotReady { addr: String, timeout: Duration },

    /// Uploaded video is longer than the configured limit
    #[error("Video should not exceed {max} seconds (got {duration:.2})")]
    VideoTooLong { duration: f64, max: f64 },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a binary-not-found error with the install hint for `name`
    pub fn binary_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        let hint = install_hint(&name);
        Self::BinaryNotFound { name, hint }
    }

    /// Create a process start error
    pub fn process_start(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessStartFailed {
            name: name.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error came from an explicit cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::ProcessCancelled { .. })
    }
}

/// Human-readable install instruction for a companion executable.
///
/// `ffprobe` ships inside the `ffmpeg` package, everything else is assumed
/// to be packaged under its own name. A platform `.exe` suffix is ignored.
pub fn install_hint(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let base = lower.strip_suffix(".exe").unwrap_or(&lower);
    match base {
        "ffprobe" | "ffmpeg" => "brew install ffmpeg".to_string(),
        other => format!("brew install {}", other),
    }
}
