//! services/api/src/web/middleware.rs
//!
//! Static API-key middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use course_assistant_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::{error::ApiError, web::state::AppState};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware that only lets requests through when the `x-api-key` header
/// matches the configured secret.
///
/// With no secret configured every request is rejected.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        warn!("API_KEY is not configured; rejecting request to {}", req.uri().path());
        return Err(PortError::Unauthorized.into());
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected) {
        warn!("Rejected request to {} with a missing or invalid API key", req.uri().path());
        return Err(PortError::Unauthorized.into());
    }

    Ok(next.run(req).await)
}
