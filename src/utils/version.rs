//! Version information

/// Crate version as recorded by Cargo
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
