//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the store ports from the `core` crate. It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shelf_core::domain::{Book, Collection, ReadingLogEntry, ReadingStats, UserId};
use shelf_core::ports::{
    BookStore, CollectionStore, PortError, PortResult, ReadingLogStore, StatsCache,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every store port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn stored_count(value: i32, column: &str) -> PortResult<u32> {
    u32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("negative value {} in {}", value, column)))
}

fn column_value(value: u32, field: &str) -> PortResult<i32> {
    i32::try_from(value)
        .map_err(|_| PortError::InvalidInput(format!("{} is too large: {}", field, value)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const BOOK_COLUMNS: &str = "id, user_id, title, author, isbn, cover_url, pdf_url, description, \
     genre, page_count, published_date, status, rating, notes, date_added";

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    user_id: String,
    title: String,
    author: String,
    isbn: Option<String>,
    cover_url: Option<String>,
    pdf_url: Option<String>,
    description: Option<String>,
    genre: Option<String>,
    page_count: Option<i32>,
    published_date: Option<String>,
    status: String,
    rating: Option<i16>,
    notes: Option<String>,
    date_added: DateTime<Utc>,
}
impl BookRecord {
    fn to_domain(self) -> PortResult<Book> {
        let rating = self
            .rating
            .map(|r| {
                u8::try_from(r)
                    .map_err(|_| PortError::Unexpected(format!("invalid rating {} in books", r)))
            })
            .transpose()?;
        Ok(Book {
            id: self.id,
            user_id: UserId::parse(&self.user_id)?,
            title: self.title,
            author: self.author,
            isbn: self.isbn,
            cover_url: self.cover_url,
            pdf_url: self.pdf_url,
            description: self.description,
            genre: self.genre,
            page_count: self
                .page_count
                .map(|p| stored_count(p, "books.page_count"))
                .transpose()?,
            published_date: self.published_date,
            status: self.status.parse()?,
            rating,
            notes: self.notes,
            date_added: self.date_added,
        })
    }
}

#[derive(FromRow)]
struct LogRecord {
    id: Uuid,
    user_id: String,
    book_id: Uuid,
    read_date: NaiveDate,
    pages_read_on_date: i32,
}
impl LogRecord {
    fn to_domain(self) -> PortResult<ReadingLogEntry> {
        Ok(ReadingLogEntry {
            id: self.id,
            user_id: UserId::parse(&self.user_id)?,
            book_id: self.book_id,
            read_date: self.read_date,
            pages_read_on_date: stored_count(
                self.pages_read_on_date,
                "daily_reading_logs.pages_read_on_date",
            )?,
        })
    }
}

/// A `reading_stats` row. Snapshot columns are NULL once invalidated.
#[derive(FromRow)]
struct StatsRecord {
    user_id: String,
    reading_goal: i32,
    books_read: Option<i32>,
    pages_read: Option<i64>,
    books_in_progress: Option<i32>,
    books_want_to_read: Option<i32>,
}
impl StatsRecord {
    fn to_domain(self) -> PortResult<Option<ReadingStats>> {
        let (Some(books_read), Some(pages_read), Some(books_in_progress), Some(books_want_to_read)) = (
            self.books_read,
            self.pages_read,
            self.books_in_progress,
            self.books_want_to_read,
        ) else {
            return Ok(None);
        };
        Ok(Some(ReadingStats {
            user_id: UserId::parse(&self.user_id)?,
            books_read: stored_count(books_read, "reading_stats.books_read")?,
            pages_read: u64::try_from(pages_read).map_err(|_| {
                PortError::Unexpected(format!("negative value {} in reading_stats.pages_read", pages_read))
            })?,
            books_in_progress: stored_count(books_in_progress, "reading_stats.books_in_progress")?,
            books_want_to_read: stored_count(books_want_to_read, "reading_stats.books_want_to_read")?,
            reading_goal: stored_count(self.reading_goal, "reading_stats.reading_goal")?,
        }))
    }
}

const COLLECTION_SELECT: &str = "SELECT c.id, c.user_id, c.name, c.description, c.color, \
     c.created_at, c.updated_at, \
     COALESCE(ARRAY_AGG(cb.book_id ORDER BY cb.position) FILTER (WHERE cb.book_id IS NOT NULL), '{}') AS book_ids \
     FROM collections c LEFT JOIN collection_books cb ON cb.collection_id = c.id";

#[derive(FromRow)]
struct CollectionRecord {
    id: Uuid,
    user_id: String,
    name: String,
    description: Option<String>,
    color: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    book_ids: Vec<Uuid>,
}
impl CollectionRecord {
    fn to_domain(self) -> PortResult<Collection> {
        Ok(Collection {
            id: self.id,
            user_id: UserId::parse(&self.user_id)?,
            name: self.name,
            description: self.description,
            color: self.color,
            book_ids: self.book_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//=========================================================================================
// `BookStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BookStore for DbAdapter {
    async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>> {
        let sql = format!(
            "SELECT {} FROM books WHERE user_id = $1 ORDER BY date_added ASC",
            BOOK_COLUMNS
        );
        let records = sqlx::query_as::<_, BookRecord>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(BookRecord::to_domain).collect()
    }

    async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book> {
        let sql = format!(
            "SELECT {} FROM books WHERE id = $1 AND user_id = $2",
            BOOK_COLUMNS
        );
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book_id)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))?
            .to_domain()
    }

    async fn insert_book(&self, book: Book) -> PortResult<Book> {
        let sql = format!(
            "INSERT INTO books ({cols}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {cols}",
            cols = BOOK_COLUMNS
        );
        let page_count = book
            .page_count
            .map(|p| column_value(p, "page_count"))
            .transpose()?;
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book.id)
            .bind(book.user_id.as_str())
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(&book.cover_url)
            .bind(&book.pdf_url)
            .bind(&book.description)
            .bind(&book.genre)
            .bind(page_count)
            .bind(&book.published_date)
            .bind(book.status.as_str())
            .bind(book.rating.map(i16::from))
            .bind(&book.notes)
            .bind(book.date_added)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn update_book(&self, book: Book) -> PortResult<Book> {
        let sql = format!(
            "UPDATE books SET title = $3, author = $4, isbn = $5, cover_url = $6, pdf_url = $7, \
             description = $8, genre = $9, page_count = $10, published_date = $11, status = $12, \
             rating = $13, notes = $14 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {}",
            BOOK_COLUMNS
        );
        let page_count = book
            .page_count
            .map(|p| column_value(p, "page_count"))
            .transpose()?;
        sqlx::query_as::<_, BookRecord>(&sql)
            .bind(book.id)
            .bind(book.user_id.as_str())
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(&book.cover_url)
            .bind(&book.pdf_url)
            .bind(&book.description)
            .bind(&book.genre)
            .bind(page_count)
            .bind(&book.published_date)
            .bind(book.status.as_str())
            .bind(book.rating.map(i16::from))
            .bind(&book.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book.id)))?
            .to_domain()
    }

    async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1 AND user_id = $2")
            .bind(book_id)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Book {} not found", book_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `ReadingLogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReadingLogStore for DbAdapter {
    async fn list_entries(&self, user_id: &UserId) -> PortResult<Vec<ReadingLogEntry>> {
        let records = sqlx::query_as::<_, LogRecord>(
            "SELECT id, user_id, book_id, read_date, pages_read_on_date \
             FROM daily_reading_logs WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(LogRecord::to_domain).collect()
    }

    async fn entries_since(
        &self,
        user_id: &UserId,
        since: NaiveDate,
    ) -> PortResult<Vec<ReadingLogEntry>> {
        let records = sqlx::query_as::<_, LogRecord>(
            "SELECT id, user_id, book_id, read_date, pages_read_on_date \
             FROM daily_reading_logs WHERE user_id = $1 AND read_date >= $2 \
             ORDER BY read_date ASC",
        )
        .bind(user_id.as_str())
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(LogRecord::to_domain).collect()
    }

    async fn append_entry(&self, entry: ReadingLogEntry) -> PortResult<ReadingLogEntry> {
        sqlx::query_as::<_, LogRecord>(
            "INSERT INTO daily_reading_logs (id, user_id, book_id, read_date, pages_read_on_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, book_id, read_date, pages_read_on_date",
        )
        .bind(entry.id)
        .bind(entry.user_id.as_str())
        .bind(entry.book_id)
        .bind(entry.read_date)
        .bind(column_value(entry.pages_read_on_date, "pages_read")?)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?
        .to_domain()
    }
}

//=========================================================================================
// `StatsCache` Trait Implementation
//=========================================================================================

#[async_trait]
impl StatsCache for DbAdapter {
    async fn get(&self, user_id: &UserId) -> PortResult<Option<ReadingStats>> {
        let record = sqlx::query_as::<_, StatsRecord>(
            "SELECT user_id, reading_goal, books_read, pages_read, books_in_progress, books_want_to_read \
             FROM reading_stats WHERE user_id = $1 AND computed_at IS NOT NULL",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => record.to_domain(),
            None => Ok(None),
        }
    }

    async fn reading_goal(&self, user_id: &UserId) -> PortResult<Option<u32>> {
        let goal: Option<i32> =
            sqlx::query_scalar("SELECT reading_goal FROM reading_stats WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;

        goal.map(|g| stored_count(g, "reading_stats.reading_goal"))
            .transpose()
    }

    /// `reading_goal` is only written for a new row.
    async fn upsert(&self, stats: &ReadingStats) -> PortResult<()> {
        let pages_read = i64::try_from(stats.pages_read)
            .map_err(|_| PortError::InvalidInput(format!("pages_read is too large: {}", stats.pages_read)))?;
        sqlx::query(
            "INSERT INTO reading_stats \
             (user_id, reading_goal, books_read, pages_read, books_in_progress, books_want_to_read, computed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET \
             books_read = EXCLUDED.books_read, \
             pages_read = EXCLUDED.pages_read, \
             books_in_progress = EXCLUDED.books_in_progress, \
             books_want_to_read = EXCLUDED.books_want_to_read, \
             computed_at = EXCLUDED.computed_at",
        )
        .bind(stats.user_id.as_str())
        .bind(column_value(stats.reading_goal, "reading_goal")?)
        .bind(column_value(stats.books_read, "books_read")?)
        .bind(pages_read)
        .bind(column_value(stats.books_in_progress, "books_in_progress")?)
        .bind(column_value(stats.books_want_to_read, "books_want_to_read")?)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete(&self, user_id: &UserId) -> PortResult<()> {
        sqlx::query(
            "UPDATE reading_stats SET books_read = NULL, pages_read = NULL, \
             books_in_progress = NULL, books_want_to_read = NULL, computed_at = NULL \
             WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn set_reading_goal(&self, user_id: &UserId, goal: u32) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO reading_stats (user_id, reading_goal) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
             reading_goal = EXCLUDED.reading_goal, books_read = NULL, pages_read = NULL, \
             books_in_progress = NULL, books_want_to_read = NULL, computed_at = NULL",
        )
        .bind(user_id.as_str())
        .bind(column_value(goal, "reading_goal")?)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `CollectionStore` Trait Implementation
//=========================================================================================

impl DbAdapter {
    async fn touch_collection(&self, collection_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE collections SET updated_at = NOW() WHERE id = $1")
            .bind(collection_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

#[async_trait]
impl CollectionStore for DbAdapter {
    async fn list_collections(&self, user_id: &UserId) -> PortResult<Vec<Collection>> {
        let sql = format!(
            "{} WHERE c.user_id = $1 GROUP BY c.id ORDER BY c.created_at ASC",
            COLLECTION_SELECT
        );
        let records = sqlx::query_as::<_, CollectionRecord>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(CollectionRecord::to_domain).collect()
    }

    async fn get_collection(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
    ) -> PortResult<Collection> {
        let sql = format!(
            "{} WHERE c.id = $1 AND c.user_id = $2 GROUP BY c.id",
            COLLECTION_SELECT
        );
        sqlx::query_as::<_, CollectionRecord>(&sql)
            .bind(collection_id)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Collection {} not found", collection_id)))?
            .to_domain()
    }

    async fn insert_collection(&self, collection: Collection) -> PortResult<Collection> {
        sqlx::query(
            "INSERT INTO collections (id, user_id, name, description, color, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(collection.id)
        .bind(collection.user_id.as_str())
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.color)
        .bind(collection.created_at)
        .bind(collection.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        self.get_collection(&collection.user_id, collection.id).await
    }

    async fn update_collection(&self, collection: Collection) -> PortResult<Collection> {
        let result = sqlx::query(
            "UPDATE collections SET name = $3, description = $4, color = $5, updated_at = $6 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(collection.id)
        .bind(collection.user_id.as_str())
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(&collection.color)
        .bind(collection.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Collection {} not found",
                collection.id
            )));
        }
        self.get_collection(&collection.user_id, collection.id).await
    }

    async fn delete_collection(&self, user_id: &UserId, collection_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1 AND user_id = $2")
            .bind(collection_id)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Collection {} not found",
                collection_id
            )));
        }
        Ok(())
    }

    async fn add_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        // Ownership check before touching the membership table.
        self.get_collection(user_id, collection_id).await?;

        let result = sqlx::query(
            "INSERT INTO collection_books (collection_id, book_id) VALUES ($1, $2) \
             ON CONFLICT (collection_id, book_id) DO NOTHING",
        )
        .bind(collection_id)
        .bind(book_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() > 0 {
            self.touch_collection(collection_id).await?;
        }
        self.get_collection(user_id, collection_id).await
    }

    async fn remove_book(
        &self,
        user_id: &UserId,
        collection_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Collection> {
        self.get_collection(user_id, collection_id).await?;

        let result = sqlx::query(
            "DELETE FROM collection_books WHERE collection_id = $1 AND book_id = $2",
        )
        .bind(collection_id)
        .bind(book_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() > 0 {
            self.touch_collection(collection_id).await?;
        }
        self.get_collection(user_id, collection_id).await
    }
}
