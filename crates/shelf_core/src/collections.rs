//! crates/shelf_core/src/collections.rs
//!
//! User-curated collections of books. Collections do not feed the reading
//! statistics, so nothing here touches the stats cache.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Book, Collection, CollectionUpdate, NewCollection, UserId};
use crate::ports::{BookStore, CollectionStore, PortError, PortResult};

pub struct Collections {
    collections: Arc<dyn CollectionStore>,
    books: Arc<dyn BookStore>,
}

fn require_name(name: &str) -> PortResult<()> {
    if name.trim().is_empty() {
        return Err(PortError::InvalidInput(
            "collection name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl Collections {
    pub fn new(collections: Arc<dyn CollectionStore>, books: Arc<dyn BookStore>) -> Self {
        Self { collections, books }
    }

    pub async fn list(&self, user_id: &UserId) -> PortResult<Vec<Collection>> {
        self.collections.list_collections(user_id).await
    }

    pub async fn get(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<Collection> {
        self.collections.get_collection(user_id, collection_id).await
    }

    pub async fn create(&self, user_id: &UserId, new: NewCollection) -> PortResult<Collection> {
        require_name(&new.name)?;
        let now = Utc::now();
        let collection = self
            .collections
            .insert_collection(Collection {
                id: Uuid::new_v4(),
                user_id: user_id.clone(),
                name: new.name,
                description: new.description,
                color: new.color,
                book_ids: Vec::new(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(collection_id = %collection.id, "Collection created");
        Ok(collection)
    }

    pub async fn update(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        update: CollectionUpdate,
    ) -> PortResult<Collection> {
        let mut collection = self.get(user_id, collection_id).await?;
        if let Some(name) = update.name {
            require_name(&name)?;
            collection.name = name;
        }
        if update.description.is_some() {
            collection.description = update.description;
        }
        if update.color.is_some() {
            collection.color = update.color;
        }
        collection.updated_at = Utc::now();
        self.collections.update_collection(collection).await
    }

    pub async fn delete(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<()> {
        self.collections.delete_collection(user_id, collection_id).await?;
        info!(collection_id = %collection_id, "Collection deleted");
        Ok(())
    }

    /// Adds one of the user's books to the collection. Already-present books are left alone.
    pub async fn add_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        self.books.get_book(user_id, book_id).await?;
        self.collections.add_book(user_id, collection_id, book_id).await
    }

    pub async fn remove_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        self.collections
            .remove_book(user_id, collection_id, book_id)
            .await
    }

    /// The collection's books, in the order they were added.
    pub async fn books_in(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<Vec<Book>> {
        let collection = self.get(user_id, collection_id).await?;
        if collection.book_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut books = self.books.list_books(user_id).await?;
        books.retain(|b| collection.book_ids.contains(&b.id));
        books.sort_by_key(|b| collection.book_ids.iter().position(|id| *id == b.id));
        Ok(books)
    }
}
