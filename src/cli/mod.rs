//! Command-line entry points
//!
//! The binary in `main.rs` parses arguments and hands off to these.

pub mod server;

pub use server::{
    ServerArgs, init_logging, load_settings, run_check_mode, run_probe_mode, run_server_mode,
};
