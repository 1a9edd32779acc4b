//! Axum application setup
//!
//! Creates and configures the host listener the tunnel forwards to.

use crate::state::PublicUrl;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Public URL published once the tunnel is running
    pub public_url: Arc<PublicUrl>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(public_url: Arc<PublicUrl>) -> Self {
        Self {
            public_url,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the main Axum application with routes and middleware
pub fn create_app(public_url: Arc<PublicUrl>) -> Router {
    let state = AppState::new(public_url);

    Router::new()
        .route("/ping", get(super::handlers::ping))
        .route("/public_url", get(super::handlers::public_url))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
