//! services/api/src/web/reading_logs.rs
//!
//! Daily reading-log entry point and the reading-progress chart data.

use crate::web::{port_error, state::AppState};
use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shelf_core::{DailyProgress, NewReadingLogEntry, ReadingLogEntry, UserId};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogReadingRequest {
    pub book_id: Uuid,
    pub pages_read: u32,
    pub date_read: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingLogResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub read_date: NaiveDate,
    pub pages_read_on_date: u32,
}

impl From<ReadingLogEntry> for ReadingLogResponse {
    fn from(entry: ReadingLogEntry) -> Self {
        Self {
            id: entry.id,
            book_id: entry.book_id,
            read_date: entry.read_date,
            pages_read_on_date: entry.pages_read_on_date,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    /// Number of trailing days to include. Defaults to the configured window.
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgressResponse {
    pub date: NaiveDate,
    /// Short chart label such as "Oct 14".
    pub label: String,
    pub pages_read: u64,
}

impl From<DailyProgress> for DailyProgressResponse {
    fn from(day: DailyProgress) -> Self {
        Self {
            date: day.date,
            label: day.date.format("%b %-d").to_string(),
            pages_read: day.pages_read,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /reading-logs - Record pages read for a book on a given day
#[utoipa::path(
    post,
    path = "/reading-logs",
    request_body = LogReadingRequest,
    responses(
        (status = 201, description = "Reading progress logged", body = ReadingLogResponse),
        (status = 404, description = "No such book in the caller's library"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn log_reading_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(req): Json<LogReadingRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entry = state
        .library
        .log_reading(
            &user_id,
            NewReadingLogEntry {
                book_id: req.book_id,
                read_date: req.date_read,
                pages_read: req.pages_read,
            },
        )
        .await
        .map_err(|e| port_error("Failed to log reading progress", e))?;

    Ok((StatusCode::CREATED, Json(ReadingLogResponse::from(entry))))
}

/// GET /reading-progress - Pages read per day over the trailing window
#[utoipa::path(
    get,
    path = "/reading-progress",
    responses(
        (status = 200, description = "Daily page totals, oldest first", body = [DailyProgressResponse]),
        (status = 400, description = "Invalid window"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ProgressQuery,
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn reading_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<ProgressQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let days = query.days.unwrap_or(state.config.progress_window_days);
    let today = Utc::now().date_naive();

    let progress = state
        .library
        .reading_progress(&user_id, today, days)
        .await
        .map_err(|e| port_error("Failed to fetch reading progress", e))?;

    Ok(Json(
        progress
            .into_iter()
            .map(DailyProgressResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::books::{create_book_handler, CreateBookRequest, BookStatusDto};
    use crate::web::stats::get_stats_handler;
    use crate::web::test_support::{body_json, test_state, user};
    use chrono::Duration;

    async fn add_book(state: &Arc<AppState>) -> Uuid {
        let req: CreateBookRequest = serde_json::from_value(serde_json::json!({
            "title": "Middlemarch",
            "author": "George Eliot",
            "status": "reading"
        }))
        .unwrap();
        let response = create_book_handler(State(state.clone()), Extension(user("alice")), Json(req))
            .await
            .into_response();
        let body = body_json(response).await;
        assert_eq!(body["status"], serde_json::json!(BookStatusDto::Reading));
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn log(state: &Arc<AppState>, book_id: Uuid, date_read: NaiveDate, pages_read: u32) {
        let response = log_reading_handler(
            State(state.clone()),
            Extension(user("alice")),
            Json(LogReadingRequest {
                book_id,
                pages_read,
                date_read,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn logged_pages_are_counted_in_stats() {
        let state = test_state();
        let book_id = add_book(&state).await;
        let today = Utc::now().date_naive();

        let before = get_stats_handler(State(state.clone()), Extension(user("alice")))
            .await
            .into_response();
        assert_eq!(body_json(before).await["pagesRead"], 0);

        for pages in [10, 15, 5] {
            log(&state, book_id, today, pages).await;
        }

        let after = get_stats_handler(State(state), Extension(user("alice")))
            .await
            .into_response();
        assert_eq!(body_json(after).await["pagesRead"], 30);
    }

    #[tokio::test]
    async fn progress_is_bucketed_per_day_within_the_window() {
        let state = test_state();
        let book_id = add_book(&state).await;
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);

        log(&state, book_id, yesterday, 12).await;
        log(&state, book_id, yesterday, 8).await;
        log(&state, book_id, today, 5).await;
        log(&state, book_id, today - Duration::days(90), 100).await;

        let response = reading_progress_handler(
            State(state),
            Extension(user("alice")),
            Query(ProgressQuery::default()),
        )
        .await
        .into_response();

        let body: Vec<DailyProgressResponse> =
            serde_json::from_value(body_json(response).await).unwrap();
        let totals: Vec<(NaiveDate, u64)> = body.iter().map(|d| (d.date, d.pages_read)).collect();
        assert_eq!(totals, vec![(yesterday, 20), (today, 5)]);
        assert_eq!(body[1].label, today.format("%b %-d").to_string());
    }

    #[tokio::test]
    async fn logging_against_an_unknown_book_is_not_found() {
        let response = log_reading_handler(
            State(test_state()),
            Extension(user("alice")),
            Json(LogReadingRequest {
                book_id: Uuid::new_v4(),
                pages_read: 10,
                date_read: Utc::now().date_naive(),
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn zero_day_window_is_rejected() {
        let response = reading_progress_handler(
            State(test_state()),
            Extension(user("alice")),
            Query(ProgressQuery { days: Some(0) }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
