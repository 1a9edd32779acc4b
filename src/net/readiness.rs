//! Port readiness polling
//!
//! Dials a local listener until it accepts a connection or the deadline
//! passes. Used once at startup, after the host listener has been spawned
//! and before the tunnel is pointed at it.

use crate::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Polls a TCP address until it accepts connections
#[derive(Debug, Clone)]
pub struct PortReadinessWaiter {
    connect_timeout: Duration,
    poll_interval: Duration,
}

impl Default for PortReadinessWaiter {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl PortReadinessWaiter {
    pub fn new(connect_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            connect_timeout,
            poll_interval,
        }
    }

    pub fn from_settings(settings: &crate::config::ReadinessSettings) -> Self {
        Self::new(settings.connect_timeout(), settings.poll_interval())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until `addr` accepts a TCP connection.
    ///
    /// The probe connection is closed immediately. Each attempt and each
    /// sleep is clipped to the time left, so a target that never comes up
    /// fails with [`Error::PortNotReady`] shortly after `timeout`.
    pub async fn wait(&self, addr: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut attempts = 0u32;

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            attempts += 1;
            let attempt_timeout = self.connect_timeout.min(deadline - now);
            match tokio::time::timeout(attempt_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    drop(stream);
                    tracing::debug!(
                        "{} accepted a connection after {} attempt(s) in {:?}",
                        addr,
                        attempts,
                        started.elapsed()
                    );
                    return Ok(());
                }
                Ok(Err(e)) => tracing::trace!("{} not ready: {}", addr, e),
                Err(_) => tracing::trace!("{} connect attempt timed out", addr),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }

        tracing::warn!("{} not ready after {} attempt(s)", addr, attempts);
        Err(Error::PortNotReady {
            addr: addr.to_string(),
            timeout,
        })
    }
}

/// Wait for `addr` with the default attempt timeout and poll interval
pub async fn wait_for_port(addr: &str, timeout: Duration) -> Result<()> {
    PortReadinessWaiter::default().wait(addr, timeout).await
}
