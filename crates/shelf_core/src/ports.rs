//! crates/shelf_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database or cache behind them.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Book, Collection, ReadingLogEntry, ReadingStats, UserId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

/// CRUD over book records, always scoped to the owning user.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>>;

    async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book>;

    async fn insert_book(&self, book: Book) -> PortResult<Book>;

    /// Replaces the stored record with `book`. Fails with `NotFound` if the
    /// (user, id) pair does not exist.
    async fn update_book(&self, book: Book) -> PortResult<Book>;

    async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()>;
}

/// Append-only daily page counts.
#[async_trait]
pub trait ReadingLogStore: Send + Sync {
    async fn list_entries(&self, user_id: &UserId) -> PortResult<Vec<ReadingLogEntry>>;

    /// Entries with `read_date >= since`, ordered by date ascending.
    async fn entries_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> PortResult<Vec<ReadingLogEntry>>;

    async fn append_entry(&self, entry: ReadingLogEntry) -> PortResult<ReadingLogEntry>;
}

/// Single-row-per-user cache of the last computed statistics.
///
/// A row can hold just the user's reading goal with no snapshot; `get` only
/// returns complete snapshots, while `reading_goal` sees either form.
#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn get(&self, user_id: &UserId) -> PortResult<Option<ReadingStats>>;

    async fn reading_goal(&self, user_id: &UserId) -> PortResult<Option<u32>>;

    /// Insert-or-replace of the snapshot keyed by `stats.user_id`. An existing
    /// row keeps its stored reading goal.
    async fn upsert(&self, stats: &ReadingStats) -> PortResult<()>;

    /// Drops the snapshot for the user. The reading goal is retained.
    async fn delete(&self, user_id: &UserId) -> PortResult<()>;

    /// Stores a new goal and drops any snapshot.
    async fn set_reading_goal(&self, user_id: &UserId, goal: u32) -> PortResult<()>;
}

#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn list_collections(&self, user_id: &UserId) -> PortResult<Vec<Collection>>;

    async fn get_collection(&self, user_id: &UserId, collection_id: Uuid)
        -> PortResult<Collection>;

    async fn insert_collection(&self, collection: Collection) -> PortResult<Collection>;

    /// Updates name, description, color and `updated_at`. Membership is
    /// managed through `add_book`/`remove_book`.
    async fn update_collection(&self, collection: Collection) -> PortResult<Collection>;

    async fn delete_collection(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<()>;

    /// Adds a book to a collection. Adding a member twice is a no-op.
    async fn add_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection>;

    async fn remove_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection>;
}
