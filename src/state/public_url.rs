//! Process-wide public URL
//!
//! Written once by the startup path after the tunnel is running, read by
//! request handlers at any time. Reads never lock.

use std::sync::OnceLock;

/// Single-writer, many-reader cell holding the tunnel's public URL
#[derive(Debug, Default)]
pub struct PublicUrl {
    cell: OnceLock<String>,
}

impl PublicUrl {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Publish the URL.
    ///
    /// Only the first call wins; a later call returns the rejected value.
    pub fn set(&self, url: impl Into<String>) -> Result<(), String> {
        self.cell.set(url.into())
    }

    /// The published URL, `None` while unset
    pub fn get(&self) -> Option<&str> {
        self.cell.get().map(String::as_str)
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}
