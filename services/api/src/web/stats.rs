//! services/api/src/web/stats.rs
//!
//! Reading statistics endpoints.

use crate::web::{port_error, state::AppState};
use axum::{
    extract::{Extension, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use shelf_core::{ReadingStats, UserId};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

/// Set to `true` when a store failure forced zeros or defaults into the body.
pub const STATS_DEGRADED_HEADER: &str = "x-stats-degraded";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStatsResponse {
    pub user_id: String,
    pub books_read: u32,
    pub pages_read: u64,
    pub books_in_progress: u32,
    pub books_want_to_read: u32,
    pub reading_goal: u32,
}

impl From<ReadingStats> for ReadingStatsResponse {
    fn from(stats: ReadingStats) -> Self {
        Self {
            user_id: stats.user_id.to_string(),
            books_read: stats.books_read,
            pages_read: stats.pages_read,
            books_in_progress: stats.books_in_progress,
            books_want_to_read: stats.books_want_to_read,
            reading_goal: stats.reading_goal,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub reading_goal: u32,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /stats - The caller's reading statistics
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Current reading statistics", body = ReadingStatsResponse,
            headers(("x-stats-degraded" = bool, description = "True when a store failure degraded the numbers"))),
        (status = 401, description = "Missing user id")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn get_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> impl IntoResponse {
    let report = state.stats.get_stats(&user_id).await;
    let degraded = report.is_degraded();
    if degraded {
        warn!(
            "Serving degraded stats for {}: {:?}",
            user_id, report.warnings
        );
    }

    let flag = HeaderValue::from_static(if degraded { "true" } else { "false" });
    (
        [(HeaderName::from_static(STATS_DEGRADED_HEADER), flag)],
        Json(ReadingStatsResponse::from(report.stats)),
    )
}

/// PUT /stats/goal - Change the caller's yearly reading goal
#[utoipa::path(
    put,
    path = "/stats/goal",
    request_body = UpdateGoalRequest,
    responses(
        (status = 204, description = "Goal updated"),
        (status = 400, description = "Goal must be at least 1"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn update_goal_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(req): Json<UpdateGoalRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .stats
        .set_reading_goal(&user_id, req.reading_goal)
        .await
        .map_err(|e| port_error("Failed to update reading goal", e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::web::test_support::{body_json, test_state, user};
    use async_trait::async_trait;
    use shelf_core::{
        Book, BookStore, Collections, InMemoryStore, Library, PortError, PortResult, StatsAggregator,
        StatsCache,
    };
    use uuid::Uuid;

    #[tokio::test]
    async fn new_user_gets_default_stats() {
        let state = test_state();

        let response = get_stats_handler(State(state), Extension(user("alice")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[STATS_DEGRADED_HEADER], "false");
        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "userId": "alice",
                "booksRead": 0,
                "pagesRead": 0,
                "booksInProgress": 0,
                "booksWantToRead": 0,
                "readingGoal": 12
            })
        );
    }

    #[tokio::test]
    async fn updated_goal_shows_up_in_stats() {
        let state = test_state();

        let status = update_goal_handler(
            State(state.clone()),
            Extension(user("alice")),
            Json(UpdateGoalRequest { reading_goal: 24 }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let response = get_stats_handler(State(state), Extension(user("alice")))
            .await
            .into_response();
        assert_eq!(body_json(response).await["readingGoal"], 24);
    }

    /// A book store whose every call fails.
    struct BooksOffline;

    fn offline() -> PortError {
        PortError::Unexpected("connection refused".to_string())
    }

    #[async_trait]
    impl BookStore for BooksOffline {
        async fn list_books(&self, _: &UserId) -> PortResult<Vec<Book>> {
            Err(offline())
        }

        async fn get_book(&self, _: &UserId, _: Uuid) -> PortResult<Book> {
            Err(offline())
        }

        async fn insert_book(&self, _: Book) -> PortResult<Book> {
            Err(offline())
        }

        async fn update_book(&self, _: Book) -> PortResult<Book> {
            Err(offline())
        }

        async fn delete_book(&self, _: &UserId, _: Uuid) -> PortResult<()> {
            Err(offline())
        }
    }

    fn state_with_books_offline(store: Arc<InMemoryStore>) -> Arc<AppState> {
        let books: Arc<dyn BookStore> = Arc::new(BooksOffline);
        let stats = Arc::new(StatsAggregator::new(
            books.clone(),
            store.clone(),
            store.clone(),
        ));
        Arc::new(AppState {
            library: Arc::new(Library::new(books.clone(), store.clone(), stats.clone())),
            collections: Arc::new(Collections::new(store, books)),
            stats,
            config: Arc::new(Config::from_lookup(|_| None).unwrap()),
        })
    }

    #[tokio::test]
    async fn book_store_outage_is_flagged_as_degraded() {
        let store = Arc::new(InMemoryStore::new());
        store.set_reading_goal(&user("alice"), 30).await.unwrap();
        let state = state_with_books_offline(store.clone());

        let response = get_stats_handler(State(state), Extension(user("alice")))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[STATS_DEGRADED_HEADER], "true");
        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "userId": "alice",
                "booksRead": 0,
                "pagesRead": 0,
                "booksInProgress": 0,
                "booksWantToRead": 0,
                "readingGoal": 30
            })
        );
        assert_eq!(store.get(&user("alice")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_goal_is_a_bad_request() {
        let (status, _) = update_goal_handler(
            State(test_state()),
            Extension(user("alice")),
            Json(UpdateGoalRequest { reading_goal: 0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
