//! Companion executable resolution
//!
//! Finds `cloudflared`, `ffprobe` and friends either inside the application
//! bundle or on the inherited `PATH`.

pub mod resolver;

pub use resolver::{BinaryResolver, ResolvedBinary, executable_name, executable_name_for, where_is};
