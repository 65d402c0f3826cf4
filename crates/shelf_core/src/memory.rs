//! crates/shelf_core/src/memory.rs
//!
//! HashMap-backed implementation of every store port, used for local
//! development without a database and as the backing store in tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::{Book, Collection, ReadingLogEntry, ReadingStats, UserId};
use crate::ports::{
    BookStore, CollectionStore, PortError, PortResult, ReadingLogStore, StatsCache,
};

/// One user's row in the stats cache. The goal outlives the snapshot.
#[derive(Debug, Clone)]
struct CachedStatsRow {
    reading_goal: u32,
    snapshot: Option<ReadingStats>,
}

#[derive(Default)]
struct Tables {
    books: HashMap<Uuid, Book>,
    logs: Vec<ReadingLogEntry>,
    stats: HashMap<UserId, CachedStatsRow>,
    collections: HashMap<Uuid, Collection>,
}

/// In-memory store backed by `Arc<RwLock<..>>`.
///
/// Clone-friendly (cloning shares the same underlying tables).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

fn owned_by<'a>(books: &'a HashMap<Uuid, Book>, user_id: &UserId, book_id: Uuid) -> Option<&'a Book> {
    books.get(&book_id).filter(|b| &b.user_id == user_id)
}

//=========================================================================================
// Books
//=========================================================================================

#[async_trait]
impl BookStore for InMemoryStore {
    async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>> {
        let tables = self.read()?;
        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|b| &b.user_id == user_id)
            .cloned()
            .collect();
        books.sort_by_key(|b| b.date_added);
        Ok(books)
    }

    async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book> {
        let tables = self.read()?;
        owned_by(&tables.books, user_id, book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn insert_book(&self, book: Book) -> PortResult<Book> {
        let mut tables = self.write()?;
        if tables.books.contains_key(&book.id) {
            return Err(PortError::Unexpected(format!("Book {} already exists", book.id)));
        }
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, book: Book) -> PortResult<Book> {
        let mut tables = self.write()?;
        if owned_by(&tables.books, &book.user_id, book.id).is_none() {
            return Err(PortError::NotFound(format!("Book {} not found", book.id)));
        }
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()> {
        let mut tables = self.write()?;
        if owned_by(&tables.books, user_id, book_id).is_none() {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        tables.books.remove(&book_id);
        for collection in tables.collections.values_mut() {
            collection.book_ids.retain(|id| *id != book_id);
        }
        Ok(())
    }
}

//=========================================================================================
// Reading Logs
//=========================================================================================

#[async_trait]
impl ReadingLogStore for InMemoryStore {
    async fn list_entries(&self, user_id: &UserId) -> PortResult<Vec<ReadingLogEntry>> {
        let tables = self.read()?;
        Ok(tables
            .logs
            .iter()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn entries_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> PortResult<Vec<ReadingLogEntry>> {
        let tables = self.read()?;
        let mut entries: Vec<ReadingLogEntry> = tables
            .logs
            .iter()
            .filter(|e| &e.user_id == user_id && e.read_date >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.read_date);
        Ok(entries)
    }

    async fn append_entry(&self, entry: ReadingLogEntry) -> PortResult<ReadingLogEntry> {
        let mut tables = self.write()?;
        tables.logs.push(entry.clone());
        Ok(entry)
    }
}

//=========================================================================================
// Stats Cache
//=========================================================================================

#[async_trait]
impl StatsCache for InMemoryStore {
    async fn get(&self, user_id: &UserId) -> PortResult<Option<ReadingStats>> {
        let tables = self.read()?;
        Ok(tables.stats.get(user_id).and_then(|row| row.snapshot.clone()))
    }

    async fn reading_goal(&self, user_id: &UserId) -> PortResult<Option<u32>> {
        let tables = self.read()?;
        Ok(tables.stats.get(user_id).map(|row| row.reading_goal))
    }

    async fn upsert(&self, stats: &ReadingStats) -> PortResult<()> {
        let mut tables = self.write()?;
        let row = tables
            .stats
            .entry(stats.user_id.clone())
            .or_insert_with(|| CachedStatsRow {
                reading_goal: stats.reading_goal,
                snapshot: None,
            });
        row.snapshot = Some(ReadingStats {
            reading_goal: row.reading_goal,
            ..stats.clone()
        });
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> PortResult<()> {
        let mut tables = self.write()?;
        if let Some(row) = tables.stats.get_mut(user_id) {
            row.snapshot = None;
        }
        Ok(())
    }

    async fn set_reading_goal(&self, user_id: &UserId, goal: u32) -> PortResult<()> {
        let mut tables = self.write()?;
        tables.stats.insert(
            user_id.clone(),
            CachedStatsRow {
                reading_goal: goal,
                snapshot: None,
            },
        );
        Ok(())
    }
}

//=========================================================================================
// Collections
//=========================================================================================

impl Tables {
    fn owned_collection_mut(
        &mut self,
        user_id: &UserId,
        collection_id: Uuid,
    ) -> PortResult<&mut Collection> {
        self.collections
            .get_mut(&collection_id)
            .filter(|c| &c.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Collection {} not found", collection_id)))
    }
}

#[async_trait]
impl CollectionStore for InMemoryStore {
    async fn list_collections(&self, user_id: &UserId) -> PortResult<Vec<Collection>> {
        let tables = self.read()?;
        let mut collections: Vec<Collection> = tables
            .collections
            .values()
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .collect();
        collections.sort_by_key(|c| c.created_at);
        Ok(collections)
    }

    async fn get_collection(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
    ) -> PortResult<Collection> {
        let tables = self.read()?;
        tables
            .collections
            .get(&collection_id)
            .filter(|c| &c.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Collection {} not found", collection_id)))
    }

    async fn insert_collection(&self, collection: Collection) -> PortResult<Collection> {
        let mut tables = self.write()?;
        tables.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn update_collection(&self, collection: Collection) -> PortResult<Collection> {
        let mut tables = self.write()?;
        let stored = tables.owned_collection_mut(&collection.user_id, collection.id)?;
        stored.name = collection.name;
        stored.description = collection.description;
        stored.color = collection.color;
        stored.updated_at = collection.updated_at;
        Ok(stored.clone())
    }

    async fn delete_collection(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<()> {
        let mut tables = self.write()?;
        tables.owned_collection_mut(user_id, collection_id)?;
        tables.collections.remove(&collection_id);
        Ok(())
    }

    async fn add_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        let mut tables = self.write()?;
        let collection = tables.owned_collection_mut(user_id, collection_id)?;
        if !collection.book_ids.contains(&book_id) {
            collection.book_ids.push(book_id);
            collection.updated_at = Utc::now();
        }
        Ok(collection.clone())
    }

    async fn remove_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        let mut tables = self.write()?;
        let collection = tables.owned_collection_mut(user_id, collection_id)?;
        let before = collection.book_ids.len();
        collection.book_ids.retain(|id| *id != book_id);
        if collection.book_ids.len() != before {
            collection.updated_at = Utc::now();
        }
        Ok(collection.clone())
    }
}
