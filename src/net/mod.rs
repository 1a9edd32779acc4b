//! Local network helpers

pub mod readiness;

pub use readiness::{PortReadinessWaiter, wait_for_port};
