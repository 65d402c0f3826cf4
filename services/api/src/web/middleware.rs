//! services/api/src/web/middleware.rs
//!
//! Resolves the calling user for protected routes.
//!
//! Authentication happens upstream: the gateway in front of this service
//! verifies the session and forwards the user id in the `x-user-id` header.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use shelf_core::UserId;
use tracing::warn;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Reads the user id forwarded by the authentication gateway.
pub fn user_from_headers(headers: &HeaderMap) -> Result<UserId, (StatusCode, String)> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                format!("{} header is required", USER_ID_HEADER),
            )
        })?;

    UserId::parse(raw).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            format!("{} header must not be empty", USER_ID_HEADER),
        )
    })
}

/// Middleware that extracts the user id and inserts it into request extensions
/// for handlers to use. Missing or blank ids are rejected with 401 Unauthorized.
pub async fn require_user(
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    let user_id = user_from_headers(req.headers()).inspect_err(|_| {
        warn!("Rejected request to {} without a user id", req.uri().path());
    })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
