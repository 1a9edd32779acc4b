//! Host listener
//!
//! A small Axum server the tunnel forwards to. It exposes health and the
//! published public URL; the photo-sharing routes live elsewhere.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app};
