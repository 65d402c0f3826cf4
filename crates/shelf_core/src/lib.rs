pub mod collections;
pub mod domain;
pub mod library;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod search;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use collections::Collections;
pub use domain::{
    Book, BookFilters, BookStatus, BookUpdate, Collection, CollectionUpdate, DailyProgress,
    NewBook, NewCollection, NewReadingLogEntry, ReadingLogEntry, ReadingStats, UserId,
    DEFAULT_READING_GOAL,
};
pub use library::Library;
pub use memory::InMemoryStore;
pub use ports::{
    BookStore, CollectionStore, PortError, PortResult, ReadingLogStore, StatsCache,
};
pub use stats::{AggregationWarning, StatsAggregator, StatsReport};
