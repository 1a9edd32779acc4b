//! Companion executable lookup
//!
//! Executables are looked up next to the running application first (so a
//! self-contained bundle can ship its own `cloudflared` / `ffprobe`), then on
//! the inherited `PATH`.

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Outcome of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinary {
    /// Absolute path to the executable
    pub executable_path: PathBuf,
    /// Bundle directory the executable was found in, if any.
    ///
    /// Callers use it as the working directory of the spawned process.
    pub search_directory: Option<PathBuf>,
}

/// Locates companion executables.
///
/// `BinaryResolver::new()` inspects the current process; the builder
/// methods pin the bundle directory and search path explicitly.
#[derive(Debug, Clone, Default)]
pub struct BinaryResolver {
    bundle_dir: Option<PathBuf>,
    search_path: Option<OsString>,
    ignore_bundle: bool,
}

impl BinaryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for bundled executables in `dir` instead of next to the current executable
    pub fn with_bundle_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bundle_dir = Some(dir.into());
        self.ignore_bundle = false;
        self
    }

    /// Skip the bundle directory entirely
    pub fn without_bundle_dir(mut self) -> Self {
        self.bundle_dir = None;
        self.ignore_bundle = true;
        self
    }

    /// Search `path` (a `PATH`-formatted list) instead of the inherited `PATH`
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Resolve `name` to an executable.
    ///
    /// The bundle directory wins over `PATH`. Fails with
    /// [`Error::BinaryNotFound`] when neither location has it.
    pub fn resolve(&self, name: &str) -> Result<ResolvedBinary> {
        let name = executable_name(name);

        if let Some(dir) = self.bundle_directory() {
            let bundled = dir.join(&name);
            if bundled.is_file() {
                tracing::debug!("Using bundled {} at {}", name, bundled.display());
                return Ok(ResolvedBinary {
                    executable_path: bundled,
                    search_directory: Some(dir),
                });
            }
        }

        if let Some(found) = self.find_in_path(&name) {
            tracing::debug!("Found {} on PATH at {}", name, found.display());
            return Ok(ResolvedBinary {
                executable_path: found,
                search_directory: None,
            });
        }

        Err(Error::binary_not_found(name))
    }

    fn bundle_directory(&self) -> Option<PathBuf> {
        if self.ignore_bundle {
            return None;
        }
        if let Some(dir) = &self.bundle_dir {
            return Some(dir.clone());
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
    }

    fn find_in_path(&self, name: &str) -> Option<PathBuf> {
        let path_var = match &self.search_path {
            Some(path) => path.clone(),
            None => std::env::var_os("PATH")?,
        };

        for dir in std::env::split_paths(&path_var) {
            if dir.as_os_str().is_empty() {
                continue;
            }
            let full = dir.join(name);
            if is_executable(&full) {
                return Some(std::path::absolute(&full).unwrap_or(full));
            }
        }
        None
    }
}

/// Resolve `name` against the current process's bundle directory and `PATH`
pub fn where_is(name: &str) -> Result<ResolvedBinary> {
    BinaryResolver::new().resolve(name)
}

/// Platform-specific executable name for `name`
pub fn executable_name(name: &str) -> String {
    executable_name_for(name, cfg!(windows))
}

/// Append `.exe` when `windows` is set and the name lacks it (case-insensitive)
pub fn executable_name_for(name: &str, windows: bool) -> String {
    if windows && !name.to_ascii_lowercase().ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
