//! HTTP request handlers

use crate::{
    server::app::AppState,
    types::{ErrorResponse, PingResponse, PublicUrlResponse},
    utils::version,
};
use axum::{extract::State, http::StatusCode, response::Json};

/// Ping endpoint for health checks
///
/// GET /ping
///
/// Returns server status and uptime information.
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let response = PingResponse::new(uptime, version::get_version());

    tracing::debug!(
        "Ping response: uptime={}s, version={}",
        uptime,
        version::get_version()
    );
    Json(response)
}

/// Public URL endpoint
///
/// GET /public_url
///
/// 503 until the tunnel has published its endpoint.
pub async fn public_url(
    State(state): State<AppState>,
) -> Result<Json<PublicUrlResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.public_url.get() {
        Some(url) => Ok(Json(PublicUrlResponse::new(url))),
        None => {
            tracing::debug!("Public URL requested before the tunnel was ready");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("public URL not ready yet")),
            ))
        }
    }
}
