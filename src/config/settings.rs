//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the startup path.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host listener configuration
    pub server: ServerSettings,
    /// Tunnel subprocess configuration
    pub tunnel: TunnelSettings,
    /// Media probe configuration
    pub probe: ProbeSettings,
    /// Port readiness polling configuration
    pub readiness: ReadinessSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Host listener configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
}

/// Tunnel subprocess configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunnelSettings {
    /// Logical name of the tunnel executable
    pub binary: String,
    /// Seconds to wait for the public URL before killing the tunnel
    pub startup_timeout_secs: u64,
}

/// Media probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Logical name of the probe executable
    pub binary: String,
    /// Longest accepted video upload, in seconds
    pub max_video_secs: f64,
}

/// Port readiness polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    /// Overall wait in seconds
    pub timeout_secs: u64,
    /// Per-attempt connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Sleep between attempts in milliseconds
    pub poll_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `gallery_tunnel=debug`
    pub level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            binary: "cloudflared".to_string(),
            startup_timeout_secs: 10,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
            max_video_secs: 30.0,
        }
    }
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            connect_timeout_ms: 500,
            poll_interval_ms: 200,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TunnelSettings {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ServerSettings {
    /// Address the readiness waiter should dial.
    ///
    /// Wildcard binds are reachable through loopback.
    pub fn readiness_addr(&self) -> String {
        match self.host.as_str() {
            "0.0.0.0" | "" => format!("127.0.0.1:{}", self.port),
            "::" => format!("[::1]:{}", self.port),
            host if host.contains(':') => format!("[{}]:{}", host, self.port),
            host => format!("{}:{}", host, self.port),
        }
    }

    /// URL handed to the tunnel for forwarding
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

impl Settings {
    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&raw)?;
        Ok(settings)
    }

    /// Apply environment variable overrides on top of `self`
    pub fn merge_with_env(self) -> crate::Result<Self> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Apply `GALLERY_*` overrides looked up through `var`
    pub fn merge_with_vars<F>(mut self, var: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("GALLERY_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("GALLERY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid port: {}", e)))?;
        }

        if let Some(binary) = var("GALLERY_TUNNEL_BINARY") {
            self.tunnel.binary = binary;
        }

        if let Some(secs) = var("GALLERY_TUNNEL_TIMEOUT_SECS") {
            self.tunnel.startup_timeout_secs = secs
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid tunnel timeout: {}", e)))?;
        }

        if let Some(binary) = var("GALLERY_PROBE_BINARY") {
            self.probe.binary = binary;
        }

        if let Some(secs) = var("GALLERY_MAX_VIDEO_SECS") {
            self.probe.max_video_secs = secs
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid max video length: {}", e)))?;
        }

        if let Some(secs) = var("GALLERY_READY_TIMEOUT_SECS") {
            self.readiness.timeout_secs = secs
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid readiness timeout: {}", e)))?;
        }

        if let Some(level) = var("GALLERY_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Reject values that would make a wait unbounded or a lookup meaningless
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.port == 0 {
            return Err(crate::Error::config("server.port must be non-zero"));
        }
        if self.tunnel.binary.trim().is_empty() {
            return Err(crate::Error::config("tunnel.binary must not be blank"));
        }
        if self.probe.binary.trim().is_empty() {
            return Err(crate::Error::config("probe.binary must not be blank"));
        }
        if self.tunnel.startup_timeout_secs == 0 {
            return Err(crate::Error::config(
                "tunnel.startup_timeout_secs must be non-zero",
            ));
        }
        if self.readiness.timeout_secs == 0
            || self.readiness.connect_timeout_ms == 0
            || self.readiness.poll_interval_ms == 0
        {
            return Err(crate::Error::config("readiness timeouts must be non-zero"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(crate::Error::config("logging.level must not be blank"));
        }
        if !(self.probe.max_video_secs.is_finite() && self.probe.max_video_secs > 0.0) {
            return Err(crate::Error::config(
                "probe.max_video_secs must be a positive number",
            ));
        }
        Ok(())
    }
}
