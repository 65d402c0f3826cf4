//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, plus the public
//! health check.

use crate::web::{books, collections, reading_logs, stats};
use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        stats::get_stats_handler,
        stats::update_goal_handler,
        books::list_books_handler,
        books::create_book_handler,
        books::get_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        books::search_books_handler,
        reading_logs::log_reading_handler,
        reading_logs::reading_progress_handler,
        collections::list_collections_handler,
        collections::create_collection_handler,
        collections::get_collection_handler,
        collections::update_collection_handler,
        collections::delete_collection_handler,
        collections::list_collection_books_handler,
        collections::add_collection_book_handler,
        collections::remove_collection_book_handler,
    ),
    components(
        schemas(
            HealthResponse,
            stats::ReadingStatsResponse,
            stats::UpdateGoalRequest,
            books::BookStatusDto,
            books::BookResponse,
            books::CreateBookRequest,
            books::UpdateBookRequest,
            books::SearchFilters,
            books::SearchRequest,
            reading_logs::LogReadingRequest,
            reading_logs::ReadingLogResponse,
            reading_logs::DailyProgressResponse,
            collections::CollectionResponse,
            collections::CreateCollectionRequest,
            collections::UpdateCollectionRequest,
            collections::AddBookRequest,
        )
    ),
    tags(
        (name = "Bookshelf API", description = "Personal library, reading logs and reading statistics.")
    )
)]
pub struct ApiDoc;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe. Does not touch storage.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
