//! Gallery tunnel binary
//!
//! Starts the host listener, exposes it through a Cloudflare quick tunnel
//! and prints the public URL.
//!
//! # Usage
//!
//! ```bash
//! gallery-tunnel --port 8000
//! gallery-tunnel check
//! gallery-tunnel probe clip.mp4
//! ```

use clap::{Parser, Subcommand};
use gallery_tunnel::cli::{self, ServerArgs};
use std::path::PathBuf;

/// Share a local Gallery server through a public tunnel
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port the host listener binds to
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Host the listener binds to
    #[arg(long, global = true)]
    host: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds to wait for the tunnel URL
    #[arg(long, global = true, value_name = "SECS")]
    tunnel_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server and tunnel (default)
    Serve,
    /// Show where cloudflared and ffprobe are found
    Check,
    /// Print the duration of a media file in seconds
    Probe {
        /// Media file to inspect
        file: PathBuf,

        /// Apply the upload length limit and delete the file if it fails
        #[arg(long)]
        enforce_limit: bool,
    },
}

impl Cli {
    fn server_args(&self) -> ServerArgs {
        ServerArgs {
            port: self.port,
            host: self.host.clone(),
            config: self.config.clone(),
            tunnel_timeout_secs: self.tunnel_timeout,
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = Cli::parse();
    let args = parsed.server_args();

    match parsed.command {
        None | Some(Command::Serve) => cli::run_server_mode(args).await,
        Some(Command::Check) => cli::run_check_mode(&args),
        Some(Command::Probe {
            file,
            enforce_limit,
        }) => cli::run_probe_mode(&args, &file, enforce_limit).await,
    }
}
