//! Container duration probing with ffprobe
//!
//! Runs `ffprobe` once per file, asking only for `format=duration` with all
//! wrappers suppressed, so stdout is a single number of seconds.

use crate::binary::BinaryResolver;
use crate::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Default probe executable
pub const FFPROBE: &str = "ffprobe";

/// Extracts the container duration of media files
#[derive(Debug, Clone)]
pub struct MediaProbe {
    resolver: BinaryResolver,
    binary: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new(BinaryResolver::new())
    }
}

impl MediaProbe {
    pub fn new(resolver: BinaryResolver) -> Self {
        Self {
            resolver,
            binary: FFPROBE.to_string(),
        }
    }

    /// Use a differently named probe executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Duration of `path` in seconds.
    ///
    /// Each call resolves and spawns its own process; concurrent calls share
    /// nothing. No retries.
    pub async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        let resolved = self.resolver.resolve(&self.binary)?;

        tracing::debug!("Probing duration of {}", path.display());

        let output = Command::new(&resolved.executable_path)
            .args(duration_args())
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::process_start(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let detail = if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr)
            };
            return Err(Error::ProbeExecutionFailed {
                tool: self.binary.clone(),
                detail,
            });
        }

        parse_duration(&self.binary, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Arguments that make ffprobe print nothing but the container duration
pub fn duration_args() -> [&'static str; 6] {
    [
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ]
}

fn parse_duration(tool: &str, stdout: &str) -> Result<f64> {
    let trimmed = stdout.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| Error::ProbeOutputInvalid {
            tool: tool.to_string(),
            output: trimmed.to_string(),
        })
}
