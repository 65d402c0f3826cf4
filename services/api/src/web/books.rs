//! services/api/src/web/books.rs
//!
//! CRUD and search endpoints for the caller's library.

use crate::web::{port_error, state::AppState};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use shelf_core::{Book, BookFilters, BookStatus, BookUpdate, NewBook, UserId};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BookStatusDto {
    WantToRead,
    Reading,
    Completed,
}

impl From<BookStatus> for BookStatusDto {
    fn from(status: BookStatus) -> Self {
        match status {
            BookStatus::WantToRead => BookStatusDto::WantToRead,
            BookStatus::Reading => BookStatusDto::Reading,
            BookStatus::Completed => BookStatusDto::Completed,
        }
    }
}

impl From<BookStatusDto> for BookStatus {
    fn from(status: BookStatusDto) -> Self {
        match status {
            BookStatusDto::WantToRead => BookStatus::WantToRead,
            BookStatusDto::Reading => BookStatus::Reading,
            BookStatusDto::Completed => BookStatus::Completed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub page_count: Option<u32>,
    pub published_date: Option<String>,
    pub status: BookStatusDto,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub date_added: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            user_id: book.user_id.to_string(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            cover_url: book.cover_url,
            pdf_url: book.pdf_url,
            description: book.description,
            genre: book.genre,
            page_count: book.page_count,
            published_date: book.published_date,
            status: book.status.into(),
            rating: book.rating,
            notes: book.notes,
            date_added: book.date_added,
        }
    }
}

pub(crate) fn book_list(books: Vec<Book>) -> Json<Vec<BookResponse>> {
    Json(books.into_iter().map(BookResponse::from).collect())
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub page_count: Option<u32>,
    pub published_date: Option<String>,
    pub status: BookStatusDto,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

impl From<CreateBookRequest> for NewBook {
    fn from(req: CreateBookRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            cover_url: req.cover_url,
            pdf_url: req.pdf_url,
            description: req.description,
            genre: req.genre,
            page_count: req.page_count,
            published_date: req.published_date,
            status: req.status.into(),
            rating: req.rating,
            notes: req.notes,
        }
    }
}

/// Reads a present field as `Some`, so an explicit `null` becomes `Some(None)`.
/// Absent fields fall back to `None` through `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update; omitted fields keep their stored values and `null`
/// clears an optional field.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub isbn: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub cover_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub pdf_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<u32>)]
    pub page_count: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub published_date: Option<Option<String>>,
    pub status: Option<BookStatusDto>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<u8>)]
    pub rating: Option<Option<u8>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

impl From<UpdateBookRequest> for BookUpdate {
    fn from(req: UpdateBookRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            cover_url: req.cover_url,
            pdf_url: req.pdf_url,
            description: req.description,
            genre: req.genre,
            page_count: req.page_count,
            published_date: req.published_date,
            status: req.status.map(BookStatus::from),
            rating: req.rating,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free text matched against title, author, genre and description.
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub status: Vec<BookStatusDto>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub rating: Option<u8>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub filters: SearchFilters,
}

impl From<SearchFilters> for BookFilters {
    fn from(filters: SearchFilters) -> Self {
        Self {
            statuses: filters.status.into_iter().map(BookStatus::from).collect(),
            genres: filters.genres,
            min_rating: filters.rating,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /books - All books in the caller's library
#[utoipa::path(
    get,
    path = "/books",
    responses(
        (status = 200, description = "The caller's books", body = [BookResponse]),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state
        .library
        .list_books(&user_id)
        .await
        .map_err(|e| port_error("Failed to fetch books", e))?;
    Ok(book_list(books))
}

/// POST /books - Add a book
#[utoipa::path(
    post,
    path = "/books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book added", body = BookResponse),
        (status = 400, description = "Invalid book"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .library
        .add_book(&user_id, req.into())
        .await
        .map_err(|e| port_error("Failed to add book", e))?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// GET /books/{id} - A single book
#[utoipa::path(
    get,
    path = "/books/{id}",
    responses(
        (status = 200, description = "The book", body = BookResponse),
        (status = 404, description = "No such book in the caller's library")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn get_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .library
        .get_book(&user_id, book_id)
        .await
        .map_err(|e| port_error("Failed to fetch book", e))?;
    Ok(Json(BookResponse::from(book)))
}

/// PUT /books/{id} - Update any subset of a book's fields
#[utoipa::path(
    put,
    path = "/books/{id}",
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Updated book", body = BookResponse),
        (status = 400, description = "Invalid update"),
        (status = 404, description = "No such book in the caller's library")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn update_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .library
        .update_book(&user_id, book_id, req.into())
        .await
        .map_err(|e| port_error("Failed to update book", e))?;
    Ok(Json(BookResponse::from(book)))
}

/// DELETE /books/{id} - Remove a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No such book in the caller's library")
    ),
    params(
        ("id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn delete_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .library
        .delete_book(&user_id, book_id)
        .await
        .map_err(|e| port_error("Failed to delete book", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /books/search - Text search plus status, genre and rating filters
#[utoipa::path(
    post,
    path = "/books/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching books", body = [BookResponse]),
        (status = 500, description = "Internal server error")
    ),
    params(
        SearchQuery,
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn search_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<SearchQuery>,
    Json(req): Json<SearchRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filters = BookFilters::from(req.filters);
    let books = state
        .library
        .search_books(&user_id, query.q.as_deref().unwrap_or_default(), &filters)
        .await
        .map_err(|e| port_error("Failed to search books", e))?;
    Ok(book_list(books))
}
