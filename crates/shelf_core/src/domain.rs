//! crates/shelf_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::ports::PortError;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Goal used when a user has never configured one.
pub const DEFAULT_READING_GOAL: u32 = 12;

/// Highest rating a book can carry.
pub const MAX_RATING: u8 = 5;

//=========================================================================================
// Users
//=========================================================================================

/// Opaque identifier of an authenticated user, as issued by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Builds a `UserId`, rejecting empty or whitespace-only input.
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PortError::InvalidInput("user id must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Books
//=========================================================================================

/// Where a book sits on the user's shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookStatus {
    WantToRead,
    Reading,
    Completed,
}

impl BookStatus {
    pub const ALL: [BookStatus; 3] = [
        BookStatus::WantToRead,
        BookStatus::Reading,
        BookStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::WantToRead => "want-to-read",
            BookStatus::Reading => "reading",
            BookStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| PortError::InvalidInput(format!("unknown book status '{}'", s)))
    }
}

/// A book in a user's library.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub page_count: Option<u32>,
    pub published_date: Option<String>,
    pub status: BookStatus,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    /// Set once at creation and never changed afterwards.
    pub date_added: DateTime<Utc>,
}

/// Everything the user supplies when adding a book.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub cover_url: Option<String>,
    pub pdf_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub page_count: Option<u32>,
    pub published_date: Option<String>,
    pub status: BookStatus,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

impl NewBook {
    /// A minimal book with only the required fields filled in.
    pub fn new(title: impl Into<String>, author: impl Into<String>, status: BookStatus) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: None,
            cover_url: None,
            pdf_url: None,
            description: None,
            genre: None,
            page_count: None,
            published_date: None,
            status,
            rating: None,
            notes: None,
        }
    }
}

/// A partial update. `None` leaves the stored value untouched. Nullable
/// fields take `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<Option<String>>,
    pub cover_url: Option<Option<String>>,
    pub pdf_url: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub genre: Option<Option<String>>,
    pub page_count: Option<Option<u32>>,
    pub published_date: Option<Option<String>>,
    pub status: Option<BookStatus>,
    pub rating: Option<Option<u8>>,
    pub notes: Option<Option<String>>,
}

impl BookUpdate {
    /// Applies the update onto an existing book. Identity and `date_added` are kept.
    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(cover_url) = self.cover_url {
            book.cover_url = cover_url;
        }
        if let Some(pdf_url) = self.pdf_url {
            book.pdf_url = pdf_url;
        }
        if let Some(description) = self.description {
            book.description = description;
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(page_count) = self.page_count {
            book.page_count = page_count;
        }
        if let Some(published_date) = self.published_date {
            book.published_date = published_date;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
        if let Some(notes) = self.notes {
            book.notes = notes;
        }
    }
}

/// Search filters for a user's library. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilters {
    pub statuses: Vec<BookStatus>,
    pub genres: Vec<String>,
    pub min_rating: Option<u8>,
}

//=========================================================================================
// Reading Logs
//=========================================================================================

/// Pages read for one book on one calendar day. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingLogEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub book_id: Uuid,
    pub read_date: NaiveDate,
    pub pages_read_on_date: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReadingLogEntry {
    pub book_id: Uuid,
    pub read_date: NaiveDate,
    pub pages_read: u32,
}

/// Total pages read on a single day, used for the progress chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyProgress {
    pub date: NaiveDate,
    pub pages_read: u64,
}

//=========================================================================================
// Reading Statistics
//=========================================================================================

/// Derived reading statistics for a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingStats {
    pub user_id: UserId,
    pub books_read: u32,
    pub pages_read: u64,
    pub books_in_progress: u32,
    pub books_want_to_read: u32,
    pub reading_goal: u32,
}

impl ReadingStats {
    /// Zeroed statistics carrying the given goal. Used for new users and for
    /// results degraded by a store failure.
    pub fn empty(user_id: UserId, reading_goal: u32) -> Self {
        Self {
            user_id,
            books_read: 0,
            pages_read: 0,
            books_in_progress: 0,
            books_want_to_read: 0,
            reading_goal,
        }
    }
}

//=========================================================================================
// Collections
//=========================================================================================

/// A named, user-curated group of books.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub book_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCollection {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}
