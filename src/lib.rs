//! Gallery tunnel - process orchestration for the Gallery photo server
//!
//! The photo-sharing server runs on the host machine and is shared with
//! guests through a Cloudflare quick tunnel. This crate owns everything that
//! talks to external processes on the way there.
//!
//! # Architecture
//!
//! - **Binary resolution**: find `cloudflared` / `ffprobe` in the app bundle or on `PATH`
//! - **Port readiness**: wait for the host listener to accept connections
//! - **Tunnel supervision**: spawn `cloudflared`, extract the public URL under a deadline
//! - **Media probing**: read video durations with `ffprobe` to vet uploads
//!
//! # Examples
//!
//! ```rust,no_run
//! use gallery_tunnel::{net::wait_for_port, tunnel::TunnelSupervisor};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> gallery_tunnel::Result<()> {
//! wait_for_port("127.0.0.1:8000", Duration::from_secs(5)).await?;
//! let tunnel = TunnelSupervisor::default()
//!     .start("http://localhost:8000", &CancellationToken::new())
//!     .await?;
//! println!("{}", tunnel.public_url());
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod cli;
pub mod config;
pub mod error;
pub mod net;
pub mod probe;
pub mod server;
pub mod state;
pub mod tunnel;
pub mod types;
pub mod utils;

pub use binary::{BinaryResolver, ResolvedBinary};
pub use config::Settings;
pub use error::{Error, Result};
pub use net::PortReadinessWaiter;
pub use probe::MediaProbe;
pub use state::PublicUrl;
pub use tunnel::{TunnelHandle, TunnelSupervisor};
