pub mod books;
pub mod collections;
pub mod middleware;
pub mod reading_logs;
pub mod rest;
pub mod state;
pub mod stats;

use crate::error::ApiError;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use shelf_core::PortError;
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

pub use middleware::require_user;

/// Maps a port failure onto the status code and message a handler returns.
/// Unexpected failures are logged and answered with `context` only.
pub(crate) fn port_error(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, ApiError> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin '{}': {}", origin, e)))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::USER_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(stats::STATS_DEGRADED_HEADER)]))
}

/// Builds the API router. Everything except `/health` requires a user id.
pub fn router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let cors = cors_layer(&state.config.cors_origin)?;

    let public_routes = Router::new().route("/health", get(rest::health_handler));

    let protected_routes = Router::new()
        .route("/stats", get(stats::get_stats_handler))
        .route("/stats/goal", put(stats::update_goal_handler))
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route("/books/search", post(books::search_books_handler))
        .route(
            "/books/{id}",
            get(books::get_book_handler)
                .put(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        .route("/reading-logs", post(reading_logs::log_reading_handler))
        .route(
            "/reading-progress",
            get(reading_logs::reading_progress_handler),
        )
        .route(
            "/collections",
            get(collections::list_collections_handler)
                .post(collections::create_collection_handler),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection_handler)
                .put(collections::update_collection_handler)
                .delete(collections::delete_collection_handler),
        )
        .route(
            "/collections/{id}/books",
            get(collections::list_collection_books_handler)
                .post(collections::add_collection_book_handler),
        )
        .route(
            "/collections/{id}/books/{book_id}",
            axum::routing::delete(collections::remove_collection_book_handler),
        )
        .route_layer(axum_middleware::from_fn(require_user));

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
