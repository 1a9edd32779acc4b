//! State shared between the startup path and request handlers

pub mod public_url;

pub use public_url::PublicUrl;
