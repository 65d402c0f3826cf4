//! services/api/src/web/collections.rs
//!
//! Named, user-curated groupings of books.

use crate::web::{books::book_list, port_error, state::AppState};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_core::{Collection, CollectionUpdate, NewCollection, UserId};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub book_ids: Vec<Uuid>,
    pub book_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Collection> for CollectionResponse {
    fn from(collection: Collection) -> Self {
        Self {
            id: collection.id,
            name: collection.name,
            description: collection.description,
            color: collection.color,
            book_count: collection.book_ids.len(),
            book_ids: collection.book_ids,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddBookRequest {
    pub book_id: Uuid,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /collections - The caller's collections
#[utoipa::path(
    get,
    path = "/collections",
    responses(
        (status = 200, description = "The caller's collections", body = [CollectionResponse]),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn list_collections_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collections = state
        .collections
        .list(&user_id)
        .await
        .map_err(|e| port_error("Failed to fetch collections", e))?;

    Ok(Json(
        collections
            .into_iter()
            .map(CollectionResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /collections - Create an empty collection
#[utoipa::path(
    post,
    path = "/collections",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = CollectionResponse),
        (status = 400, description = "Name is required"),
        (status = 500, description = "Internal server error")
    ),
    params(("x-user-id" = String, Header, description = "The authenticated user's id."))
)]
pub async fn create_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collection = state
        .collections
        .create(
            &user_id,
            NewCollection {
                name: req.name,
                description: req.description,
                color: req.color,
            },
        )
        .await
        .map_err(|e| port_error("Failed to create collection", e))?;

    Ok((StatusCode::CREATED, Json(CollectionResponse::from(collection))))
}

/// GET /collections/{id} - One collection
#[utoipa::path(
    get,
    path = "/collections/{id}",
    responses(
        (status = 200, description = "The collection", body = CollectionResponse),
        (status = 404, description = "Collection not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn get_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(collection_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collection = state
        .collections
        .get(&user_id, collection_id)
        .await
        .map_err(|e| port_error("Failed to fetch collection", e))?;
    Ok(Json(CollectionResponse::from(collection)))
}

/// PUT /collections/{id} - Rename or restyle a collection
#[utoipa::path(
    put,
    path = "/collections/{id}",
    request_body = UpdateCollectionRequest,
    responses(
        (status = 200, description = "Collection updated", body = CollectionResponse),
        (status = 400, description = "Name must not be blank"),
        (status = 404, description = "Collection not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn update_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(collection_id): Path<Uuid>,
    Json(req): Json<UpdateCollectionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collection = state
        .collections
        .update(
            &user_id,
            collection_id,
            CollectionUpdate {
                name: req.name,
                description: req.description,
                color: req.color,
            },
        )
        .await
        .map_err(|e| port_error("Failed to update collection", e))?;
    Ok(Json(CollectionResponse::from(collection)))
}

/// DELETE /collections/{id} - Delete a collection. Its books stay in the library.
#[utoipa::path(
    delete,
    path = "/collections/{id}",
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 404, description = "Collection not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn delete_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(collection_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .collections
        .delete(&user_id, collection_id)
        .await
        .map_err(|e| port_error("Failed to delete collection", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /collections/{id}/books - The books in a collection, in insertion order
#[utoipa::path(
    get,
    path = "/collections/{id}/books",
    responses(
        (status = 200, description = "Books in the collection", body = [crate::web::books::BookResponse]),
        (status = 404, description = "Collection not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn list_collection_books_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(collection_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state
        .collections
        .books_in(&user_id, collection_id)
        .await
        .map_err(|e| port_error("Failed to fetch collection books", e))?;
    Ok(book_list(books))
}

/// POST /collections/{id}/books - Add one of the caller's books
#[utoipa::path(
    post,
    path = "/collections/{id}/books",
    request_body = AddBookRequest,
    responses(
        (status = 200, description = "Book added", body = CollectionResponse),
        (status = 404, description = "Collection or book not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn add_collection_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(collection_id): Path<Uuid>,
    Json(req): Json<AddBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collection = state
        .collections
        .add_book(&user_id, collection_id, req.book_id)
        .await
        .map_err(|e| port_error("Failed to add book to collection", e))?;
    Ok(Json(CollectionResponse::from(collection)))
}

/// DELETE /collections/{id}/books/{book_id} - Take a book out of a collection
#[utoipa::path(
    delete,
    path = "/collections/{id}/books/{book_id}",
    responses(
        (status = 200, description = "Book removed", body = CollectionResponse),
        (status = 404, description = "Collection not found")
    ),
    params(
        ("id" = Uuid, Path, description = "Collection id"),
        ("book_id" = Uuid, Path, description = "Book id"),
        ("x-user-id" = String, Header, description = "The authenticated user's id.")
    )
)]
pub async fn remove_collection_book_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path((collection_id, book_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let collection = state
        .collections
        .remove_book(&user_id, collection_id, book_id)
        .await
        .map_err(|e| port_error("Failed to remove book from collection", e))?;
    Ok(Json(CollectionResponse::from(collection)))
}
