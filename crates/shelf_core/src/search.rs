//! crates/shelf_core/src/search.rs
//!
//! In-process filtering of a user's library.

use crate::domain::{Book, BookFilters};

/// Case-insensitive match of `query` against title, author, genre and description.
pub fn matches_query(book: &Book, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let contains = |field: &str| field.to_lowercase().contains(&needle);

    contains(&book.title)
        || contains(&book.author)
        || book.genre.as_deref().is_some_and(contains)
        || book.description.as_deref().is_some_and(contains)
}

pub fn matches_filters(book: &Book, filters: &BookFilters) -> bool {
    if !filters.statuses.is_empty() && !filters.statuses.contains(&book.status) {
        return false;
    }
    if !filters.genres.is_empty()
        && !book
            .genre
            .as_ref()
            .is_some_and(|genre| filters.genres.contains(genre))
    {
        return false;
    }
    match filters.min_rating {
        Some(min) => book.rating.is_some_and(|rating| rating >= min),
        None => true,
    }
}

/// Keeps the books matching both the text query and the filters, preserving order.
pub fn filter_books(books: Vec<Book>, query: &str, filters: &BookFilters) -> Vec<Book> {
    books
        .into_iter()
        .filter(|book| matches_query(book, query) && matches_filters(book, filters))
        .collect()
}
