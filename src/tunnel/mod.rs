//! Public tunnel for the local server
//!
//! Uses `cloudflared` quick tunnels: a free, random `trycloudflare.com` URL
//! that lives as long as the subprocess does.
//!
//! # Usage
//!
//! ```rust,no_run
//! use gallery_tunnel::tunnel::TunnelSupervisor;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> gallery_tunnel::Result<()> {
//! let supervisor = TunnelSupervisor::default();
//! let mut tunnel = supervisor
//!     .start("http://localhost:8000", &CancellationToken::new())
//!     .await?;
//! println!("Public URL: {}", tunnel.public_url());
//! tunnel.close().await;
//! # Ok(())
//! # }
//! ```

pub mod pattern;
pub mod supervisor;

pub use pattern::extract_public_url;
pub use supervisor::{
    CLOUDFLARED, DEFAULT_STARTUP_TIMEOUT, TunnelHandle, TunnelState, TunnelSupervisor,
};
