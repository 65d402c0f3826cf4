//! Shared fixtures for unit tests: a wrapper around `InMemoryStore` whose
//! individual operations can be switched to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Book, BookStatus, Collection, ReadingLogEntry, ReadingStats, UserId};
use crate::memory::InMemoryStore;
use crate::ports::{
    BookStore, CollectionStore, PortError, PortResult, ReadingLogStore, StatsCache,
};

pub fn user(raw: &str) -> UserId {
    UserId::parse(raw).unwrap()
}

pub fn book_for(owner: &UserId, status: BookStatus, page_count: Option<u32>) -> Book {
    Book {
        id: Uuid::new_v4(),
        user_id: owner.clone(),
        title: "The Left Hand of Darkness".to_string(),
        author: "Ursula K. Le Guin".to_string(),
        isbn: None,
        cover_url: None,
        pdf_url: None,
        description: None,
        genre: Some("Science Fiction".to_string()),
        page_count,
        published_date: None,
        status,
        rating: None,
        notes: None,
        date_added: Utc::now(),
    }
}

pub fn log_for(owner: &UserId, book_id: Uuid, pages: u32) -> ReadingLogEntry {
    ReadingLogEntry {
        id: Uuid::new_v4(),
        user_id: owner.clone(),
        book_id,
        read_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        pages_read_on_date: pages,
    }
}

#[derive(Default)]
struct Switches {
    books: AtomicBool,
    logs: AtomicBool,
    cache_reads: AtomicBool,
    upsert: AtomicBool,
    cache_deletes: AtomicBool,
    book_fetches: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    switches: Arc<Switches>,
}

fn outage(what: &str) -> PortError {
    PortError::Unexpected(format!("{} unavailable", what))
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, bypassing failure switches and counters.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn fail_books(&self, fail: bool) {
        self.switches.books.store(fail, Ordering::SeqCst);
    }

    pub fn fail_logs(&self, fail: bool) {
        self.switches.logs.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cache_reads(&self, fail: bool) {
        self.switches.cache_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upsert(&self, fail: bool) {
        self.switches.upsert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cache_deletes(&self, fail: bool) {
        self.switches.cache_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn book_fetches(&self) -> usize {
        self.switches.book_fetches.load(Ordering::SeqCst)
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> PortResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(outage(what))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BookStore for FlakyStore {
    async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>> {
        self.switches.book_fetches.fetch_add(1, Ordering::SeqCst);
        self.check(&self.switches.books, "book store")?;
        self.inner.list_books(user_id).await
    }

    async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book> {
        self.check(&self.switches.books, "book store")?;
        self.inner.get_book(user_id, book_id).await
    }

    async fn insert_book(&self, book: Book) -> PortResult<Book> {
        self.check(&self.switches.books, "book store")?;
        self.inner.insert_book(book).await
    }

    async fn update_book(&self, book: Book) -> PortResult<Book> {
        self.check(&self.switches.books, "book store")?;
        self.inner.update_book(book).await
    }

    async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()> {
        self.check(&self.switches.books, "book store")?;
        self.inner.delete_book(user_id, book_id).await
    }
}

#[async_trait]
impl ReadingLogStore for FlakyStore {
    async fn list_entries(&self, user_id: &UserId) -> PortResult<Vec<ReadingLogEntry>> {
        self.check(&self.switches.logs, "reading log store")?;
        self.inner.list_entries(user_id).await
    }

    async fn entries_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> PortResult<Vec<ReadingLogEntry>> {
        self.check(&self.switches.logs, "reading log store")?;
        self.inner.entries_since(user_id, since).await
    }

    async fn append_entry(&self, entry: ReadingLogEntry) -> PortResult<ReadingLogEntry> {
        self.check(&self.switches.logs, "reading log store")?;
        self.inner.append_entry(entry).await
    }
}

#[async_trait]
impl StatsCache for FlakyStore {
    async fn get(&self, user_id: &UserId) -> PortResult<Option<ReadingStats>> {
        self.check(&self.switches.cache_reads, "stats cache")?;
        self.inner.get(user_id).await
    }

    async fn reading_goal(&self, user_id: &UserId) -> PortResult<Option<u32>> {
        self.check(&self.switches.cache_reads, "stats cache")?;
        self.inner.reading_goal(user_id).await
    }

    async fn upsert(&self, stats: &ReadingStats) -> PortResult<()> {
        self.check(&self.switches.upsert, "stats cache")?;
        self.inner.upsert(stats).await
    }

    async fn delete(&self, user_id: &UserId) -> PortResult<()> {
        self.check(&self.switches.cache_deletes, "stats cache")?;
        self.inner.delete(user_id).await
    }

    async fn set_reading_goal(&self, user_id: &UserId, goal: u32) -> PortResult<()> {
        self.inner.set_reading_goal(user_id, goal).await
    }
}

#[async_trait]
impl CollectionStore for FlakyStore {
    async fn list_collections(&self, user_id: &UserId) -> PortResult<Vec<Collection>> {
        self.inner.list_collections(user_id).await
    }

    async fn get_collection(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
    ) -> PortResult<Collection> {
        self.inner.get_collection(user_id, collection_id).await
    }

    async fn insert_collection(&self, collection: Collection) -> PortResult<Collection> {
        self.inner.insert_collection(collection).await
    }

    async fn update_collection(&self, collection: Collection) -> PortResult<Collection> {
        self.inner.update_collection(collection).await
    }

    async fn delete_collection(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<()> {
        self.inner.delete_collection(user_id, collection_id).await
    }

    async fn add_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        self.inner.add_book(user_id, collection_id, book_id).await
    }

    async fn remove_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        self.inner.remove_book(user_id, collection_id, book_id).await
    }
}
