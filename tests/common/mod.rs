//! Common test utilities and helpers
//!
//! Shell-script stand-ins for cloudflared and ffprobe.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use gallery_tunnel::BinaryResolver;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Directory of stub executables, searched as the only `PATH` entry
    pub struct StubBin {
        dir: TempDir,
    }

    impl StubBin {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Write an executable `/bin/sh` script named `name`
        pub fn script(&self, name: &str, body: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            make_executable(&path);
            path
        }

        /// Resolver that only looks in this directory, via the search path
        pub fn resolver(&self) -> BinaryResolver {
            BinaryResolver::new()
                .without_bundle_dir()
                .with_search_path(self.dir.path().as_os_str())
        }
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(not(unix))]
    fn make_executable(_path: &Path) {}

    /// Whether a process with `pid` still exists
    #[cfg(unix)]
    pub fn process_alive(pid: u32) -> bool {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}
