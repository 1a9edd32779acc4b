//! Configuration management
//!
//! This module handles loading and managing the policy values (binary names,
//! deadlines, limits) used by the startup path.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, default_config_path};
pub use settings::{
    LoggingSettings, ProbeSettings, ReadinessSettings, ServerSettings, Settings, TunnelSettings,
};
