//! crates/shelf_core/src/library.rs
//!
//! Book and reading-log operations. Every successful mutation drops the
//! user's cached statistics before returning.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{
    Book, BookFilters, BookUpdate, DailyProgress, NewBook, NewReadingLogEntry, ReadingLogEntry,
    UserId, MAX_RATING,
};
use crate::ports::{BookStore, PortError, PortResult, ReadingLogStore};
use crate::progress;
use crate::search;
use crate::stats::StatsAggregator;

fn require_text(field: &str, value: &str) -> PortResult<()> {
    if value.trim().is_empty() {
        return Err(PortError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_rating(rating: Option<u8>) -> PortResult<()> {
    match rating {
        Some(r) if r > MAX_RATING => Err(PortError::InvalidInput(format!(
            "Rating must be between 0 and {}",
            MAX_RATING
        ))),
        _ => Ok(()),
    }
}

pub struct Library {
    books: Arc<dyn BookStore>,
    logs: Arc<dyn ReadingLogStore>,
    stats: Arc<StatsAggregator>,
}

impl Library {
    pub fn new(
        books: Arc<dyn BookStore>,
        logs: Arc<dyn ReadingLogStore>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self { books, logs, stats }
    }

    pub async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>> {
        self.books.list_books(user_id).await
    }

    pub async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book> {
        self.books.get_book(user_id, book_id).await
    }

    #[instrument(skip(self, user_id, new_book), fields(user_id = %user_id))]
    pub async fn add_book(&self, user_id: &UserId, new_book: NewBook) -> PortResult<Book> {
        require_text("title", &new_book.title)?;
        require_text("author", &new_book.author)?;
        require_rating(new_book.rating)?;

        let book = Book {
            id: Uuid::new_v4(),
            user_id: user_id.clone(),
            title: new_book.title,
            author: new_book.author,
            isbn: new_book.isbn,
            cover_url: new_book.cover_url,
            pdf_url: new_book.pdf_url,
            description: new_book.description,
            genre: new_book.genre,
            page_count: new_book.page_count,
            published_date: new_book.published_date,
            status: new_book.status,
            rating: new_book.rating,
            notes: new_book.notes,
            date_added: Utc::now(),
        };
        let book = self.books.insert_book(book).await?;
        info!(book_id = %book.id, "Book added");

        self.stats.invalidate(user_id).await;
        Ok(book)
    }

    #[instrument(skip(self, user_id, update), fields(user_id = %user_id))]
    pub async fn update_book(
        &self,
        user_id: &UserId,
        book_id: Uuid,
        update: BookUpdate,
    ) -> PortResult<Book> {
        if let Some(title) = &update.title {
            require_text("title", title)?;
        }
        if let Some(author) = &update.author {
            require_text("author", author)?;
        }
        require_rating(update.rating.flatten())?;

        let mut book = self.books.get_book(user_id, book_id).await?;
        update.apply_to(&mut book);
        let book = self.books.update_book(book).await?;
        info!("Book updated");

        self.stats.invalidate(user_id).await;
        Ok(book)
    }

    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()> {
        self.books.delete_book(user_id, book_id).await?;
        info!("Book deleted");

        self.stats.invalidate(user_id).await;
        Ok(())
    }

    pub async fn search_books(
        &self,
        user_id: &UserId,
        query: &str,
        filters: &BookFilters,
    ) -> PortResult<Vec<Book>> {
        let books = self.books.list_books(user_id).await?;
        Ok(search::filter_books(books, query, filters))
    }

    /// Appends a reading-log entry for one of the user's books.
    #[instrument(skip(self, user_id, entry), fields(user_id = %user_id, book_id = %entry.book_id))]
    pub async fn log_reading(
        &self,
        user_id: &UserId,
        entry: NewReadingLogEntry,
    ) -> PortResult<ReadingLogEntry> {
        self.books.get_book(user_id, entry.book_id).await?;

        let entry = self
            .logs
            .append_entry(ReadingLogEntry {
                id: Uuid::new_v4(),
                user_id: user_id.clone(),
                book_id: entry.book_id,
                read_date: entry.read_date,
                pages_read_on_date: entry.pages_read,
            })
            .await?;
        info!(pages = entry.pages_read_on_date, "Reading progress logged");

        self.stats.invalidate(user_id).await;
        Ok(entry)
    }

    /// Pages read per day over the `days` days leading up to `today`.
    pub async fn reading_progress(
        &self,
        user_id: &UserId,
        today: NaiveDate,
        days: u32,
    ) -> PortResult<Vec<DailyProgress>> {
        if days == 0 {
            return Err(PortError::InvalidInput("days must be at least 1".to_string()));
        }
        let entries = self
            .logs
            .entries_since(user_id, progress::window_start(today, days))
            .await?;
        Ok(progress::daily_totals(&entries))
    }
}
