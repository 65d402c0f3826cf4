//! crates/shelf_core/src/stats.rs
//!
//! Reading statistics: computed from books and reading logs, cached per user,
//! and dropped from the cache whenever the underlying data changes.
//!
//! The cache has no TTL. A missing snapshot is the only staleness signal, and
//! every book or log mutation removes the snapshot through [`StatsAggregator::invalidate`].

use std::sync::Arc;

use futures::join;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{Book, BookStatus, ReadingLogEntry, ReadingStats, UserId, DEFAULT_READING_GOAL};
use crate::ports::{BookStore, PortError, PortResult, ReadingLogStore, StatsCache};

/// A non-fatal problem encountered while producing statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationWarning {
    #[error("stats cache could not be read: {0}")]
    CacheReadFailed(PortError),
    #[error("stored reading goal could not be read: {0}")]
    GoalUnavailable(PortError),
    #[error("books could not be fetched: {0}")]
    BooksUnavailable(PortError),
    #[error("reading logs could not be fetched: {0}")]
    LogsUnavailable(PortError),
    #[error("stats cache could not be written: {0}")]
    CacheWriteFailed(PortError),
}

impl AggregationWarning {
    /// Whether the returned numbers may be wrong because of this warning.
    pub fn affects_stats(&self) -> bool {
        matches!(
            self,
            AggregationWarning::GoalUnavailable(_)
                | AggregationWarning::BooksUnavailable(_)
                | AggregationWarning::LogsUnavailable(_)
        )
    }
}

/// The outcome of [`StatsAggregator::get_stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub stats: ReadingStats,
    pub warnings: Vec<AggregationWarning>,
    pub from_cache: bool,
}

impl StatsReport {
    /// True when a store failure forced zeros or defaults into the stats.
    pub fn is_degraded(&self) -> bool {
        self.warnings.iter().any(AggregationWarning::affects_stats)
    }
}

/// Derives statistics from raw rows. `pages_read` comes from the reading log
/// only; `Book::page_count` is not part of it.
pub fn tally(
    user_id: UserId,
    reading_goal: u32,
    books: &[Book],
    entries: &[ReadingLogEntry],
) -> ReadingStats {
    let count = |status: BookStatus| books.iter().filter(|b| b.status == status).count() as u32;

    ReadingStats {
        user_id,
        books_read: count(BookStatus::Completed),
        pages_read: entries
            .iter()
            .map(|e| u64::from(e.pages_read_on_date))
            .sum(),
        books_in_progress: count(BookStatus::Reading),
        books_want_to_read: count(BookStatus::WantToRead),
        reading_goal,
    }
}

/// Produces up-to-date `ReadingStats`, transparently using the stats cache.
pub struct StatsAggregator {
    books: Arc<dyn BookStore>,
    logs: Arc<dyn ReadingLogStore>,
    cache: Arc<dyn StatsCache>,
}

impl StatsAggregator {
    pub fn new(
        books: Arc<dyn BookStore>,
        logs: Arc<dyn ReadingLogStore>,
        cache: Arc<dyn StatsCache>,
    ) -> Self {
        Self { books, logs, cache }
    }

    /// Returns the user's statistics. Never fails: store errors degrade the
    /// result and are reported through `StatsReport::warnings`.
    ///
    /// Degraded results are returned but not written to the cache, including
    /// book-derived counts computed while the reading log was unavailable.
    /// The next call recomputes them.
    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn get_stats(&self, user_id: &UserId) -> StatsReport {
        let mut warnings = Vec::new();

        match self.cache.get(user_id).await {
            Ok(Some(stats)) => {
                debug!("Stats cache hit");
                return StatsReport {
                    stats,
                    warnings,
                    from_cache: true,
                };
            }
            Ok(None) => debug!("Stats cache miss, recomputing"),
            Err(e) => {
                warn!("Failed to read stats cache, recomputing: {}", e);
                warnings.push(AggregationWarning::CacheReadFailed(e));
            }
        }

        let reading_goal = match self.cache.reading_goal(user_id).await {
            Ok(goal) => goal.unwrap_or(DEFAULT_READING_GOAL),
            Err(e) => {
                warn!("Failed to read stored reading goal, using default: {}", e);
                warnings.push(AggregationWarning::GoalUnavailable(e));
                DEFAULT_READING_GOAL
            }
        };

        let (books, entries) = join!(
            self.books.list_books(user_id),
            self.logs.list_entries(user_id)
        );

        let books = match books {
            Ok(books) => books,
            Err(e) => {
                error!("Error fetching books: {}", e);
                warnings.push(AggregationWarning::BooksUnavailable(e));
                return StatsReport {
                    stats: ReadingStats::empty(user_id.clone(), reading_goal),
                    warnings,
                    from_cache: false,
                };
            }
        };

        let entries = match entries {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error fetching reading logs, counting zero pages: {}", e);
                warnings.push(AggregationWarning::LogsUnavailable(e));
                Vec::new()
            }
        };

        let stats = tally(user_id.clone(), reading_goal, &books, &entries);

        if warnings.iter().any(AggregationWarning::affects_stats) {
            warn!("Not caching degraded reading stats");
        } else if let Err(e) = self.cache.upsert(&stats).await {
            error!("Error saving reading stats: {}", e);
            warnings.push(AggregationWarning::CacheWriteFailed(e));
        }

        StatsReport {
            stats,
            warnings,
            from_cache: false,
        }
    }

    /// Drops the cached snapshot. Failures are logged and swallowed so the
    /// mutation that triggered the call still succeeds.
    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn invalidate(&self, user_id: &UserId) {
        match self.cache.delete(user_id).await {
            Ok(()) => debug!("Stats cache invalidated"),
            Err(e) => error!("Error deleting stats cache: {}", e),
        }
    }

    /// Stores a new reading goal. The snapshot is dropped with it so the next
    /// read recomputes under the new goal.
    #[instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn set_reading_goal(&self, user_id: &UserId, goal: u32) -> PortResult<()> {
        if goal == 0 {
            return Err(PortError::InvalidInput(
                "reading goal must be at least 1".to_string(),
            ));
        }
        self.cache.set_reading_goal(user_id, goal).await?;
        info!(goal, "Reading goal updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::test_support::{book_for, log_for, user, FlakyStore};
    use async_trait::async_trait;
    use uuid::Uuid;

    fn aggregator(store: &FlakyStore) -> StatsAggregator {
        let store = Arc::new(store.clone());
        StatsAggregator::new(store.clone(), store.clone(), store)
    }

    async fn seed_reference_library(store: &FlakyStore, owner: &UserId) {
        for status in [
            BookStatus::Completed,
            BookStatus::Completed,
            BookStatus::Reading,
            BookStatus::WantToRead,
        ] {
            store.insert_book(book_for(owner, status, Some(300))).await.unwrap();
        }
        let any_book = store.inner().list_books(owner).await.unwrap()[0].id;
        for pages in [10, 15, 5] {
            store.append_entry(log_for(owner, any_book, pages)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn new_user_gets_zeroed_stats_with_default_goal() {
        let store = FlakyStore::new();
        let stats = aggregator(&store).get_stats(&user("fresh")).await;

        assert_eq!(stats.stats, ReadingStats::empty(user("fresh"), 12));
        assert!(!stats.is_degraded());
        assert!(!stats.from_cache);
    }

    #[tokio::test]
    async fn cache_miss_recomputes_from_books_and_logs() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;

        let report = aggregator(&store).get_stats(&alice).await;

        assert_eq!(report.stats.books_read, 2);
        assert_eq!(report.stats.pages_read, 30);
        assert_eq!(report.stats.books_in_progress, 1);
        assert_eq!(report.stats.books_want_to_read, 1);
        assert_eq!(report.stats.reading_goal, 12);
        assert_eq!(store.inner().get(&alice).await.unwrap(), Some(report.stats));
    }

    #[tokio::test]
    async fn page_count_of_completed_books_is_not_summed() {
        let store = FlakyStore::new();
        let alice = user("alice");
        store
            .insert_book(book_for(&alice, BookStatus::Completed, Some(500)))
            .await
            .unwrap();

        let report = aggregator(&store).get_stats(&alice).await;
        assert_eq!(report.stats.books_read, 1);
        assert_eq!(report.stats.pages_read, 0);
    }

    #[tokio::test]
    async fn warm_cache_returns_identical_results() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        let stats = aggregator(&store);

        let first = stats.get_stats(&alice).await;
        let second = stats.get_stats(&alice).await;

        assert!(second.from_cache);
        assert_eq!(first.stats, second.stats);
        assert_eq!(store.book_fetches(), 1);
    }

    #[tokio::test]
    async fn cached_snapshot_is_served_even_if_sources_change_without_invalidation() {
        let store = FlakyStore::new();
        let alice = user("alice");
        let stats = aggregator(&store);
        stats.get_stats(&alice).await;

        store
            .insert_book(book_for(&alice, BookStatus::Completed, None))
            .await
            .unwrap();

        assert_eq!(stats.get_stats(&alice).await.stats.books_read, 0);
    }

    #[tokio::test]
    async fn invalidation_forces_a_fresh_recompute() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        let stats = aggregator(&store);
        let before = stats.get_stats(&alice).await.stats;

        let mut reading = store
            .list_books(&alice)
            .await
            .unwrap()
            .into_iter()
            .find(|b| b.status == BookStatus::Reading)
            .unwrap();
        reading.status = BookStatus::Completed;
        store.update_book(reading).await.unwrap();
        stats.invalidate(&alice).await;

        let after = stats.get_stats(&alice).await;
        assert!(!after.from_cache);
        assert_eq!(after.stats.books_read, before.books_read + 1);
        assert_eq!(after.stats.books_in_progress, before.books_in_progress - 1);
    }

    #[tokio::test]
    async fn goal_survives_invalidation() {
        let store = FlakyStore::new();
        let alice = user("alice");
        let stats = aggregator(&store);
        store.inner().upsert(&ReadingStats::empty(alice.clone(), 24)).await.unwrap();

        stats.invalidate(&alice).await;
        let report = stats.get_stats(&alice).await;

        assert!(!report.from_cache);
        assert_eq!(report.stats.reading_goal, 24);
    }

    #[tokio::test]
    async fn goal_only_row_is_used_on_recompute() {
        let store = FlakyStore::new();
        let alice = user("alice");
        let stats = aggregator(&store);

        stats.set_reading_goal(&alice, 40).await.unwrap();
        let report = stats.get_stats(&alice).await;

        assert_eq!(report.stats.reading_goal, 40);
        assert_eq!(store.inner().get(&alice).await.unwrap(), Some(report.stats));
    }

    #[tokio::test]
    async fn changing_the_goal_drops_the_snapshot() {
        let store = FlakyStore::new();
        let alice = user("alice");
        let stats = aggregator(&store);
        stats.get_stats(&alice).await;

        stats.set_reading_goal(&alice, 30).await.unwrap();

        let report = stats.get_stats(&alice).await;
        assert!(!report.from_cache);
        assert_eq!(report.stats.reading_goal, 30);
    }

    #[tokio::test]
    async fn zero_goal_is_rejected() {
        let store = FlakyStore::new();
        let err = aggregator(&store)
            .set_reading_goal(&user("alice"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn book_fetch_failure_degrades_to_zeros_with_prior_goal() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        store.inner().set_reading_goal(&alice, 24).await.unwrap();
        store.fail_books(true);

        let report = aggregator(&store).get_stats(&alice).await;

        assert!(report.is_degraded());
        assert_eq!(report.stats, ReadingStats::empty(alice.clone(), 24));
        assert!(matches!(
            report.warnings.as_slice(),
            [AggregationWarning::BooksUnavailable(_)]
        ));
        assert_eq!(store.inner().get(&alice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn log_fetch_failure_only_zeroes_pages() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        store.fail_logs(true);

        let report = aggregator(&store).get_stats(&alice).await;

        assert!(report.is_degraded());
        assert_eq!(report.stats.pages_read, 0);
        assert_eq!(report.stats.books_read, 2);
        assert_eq!(report.stats.books_in_progress, 1);
        assert_eq!(report.stats.books_want_to_read, 1);
    }

    #[tokio::test]
    async fn degraded_results_are_recomputed_once_stores_recover() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        let stats = aggregator(&store);

        store.fail_logs(true);
        assert_eq!(stats.get_stats(&alice).await.stats.pages_read, 0);

        store.fail_logs(false);
        let recovered = stats.get_stats(&alice).await;
        assert!(!recovered.from_cache);
        assert_eq!(recovered.stats.pages_read, 30);
    }

    #[tokio::test]
    async fn upsert_failure_still_returns_fresh_stats() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        store.fail_upsert(true);

        let report = aggregator(&store).get_stats(&alice).await;

        assert!(!report.is_degraded());
        assert_eq!(report.stats.books_read, 2);
        assert!(matches!(
            report.warnings.as_slice(),
            [AggregationWarning::CacheWriteFailed(_)]
        ));
        assert_eq!(store.inner().get(&alice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_cache_is_treated_as_a_miss() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        store.fail_cache_reads(true);

        let report = aggregator(&store).get_stats(&alice).await;

        assert_eq!(report.stats.books_read, 2);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, AggregationWarning::CacheReadFailed(_))));
    }

    #[tokio::test]
    async fn failed_invalidation_is_swallowed() {
        let store = FlakyStore::new();
        store.fail_cache_deletes(true);
        aggregator(&store).invalidate(&user("alice")).await;
    }

    #[tokio::test]
    async fn stats_are_scoped_to_the_user() {
        let store = FlakyStore::new();
        let alice = user("alice");
        seed_reference_library(&store, &alice).await;
        store
            .insert_book(book_for(&user("bob"), BookStatus::Reading, None))
            .await
            .unwrap();

        let bob = aggregator(&store).get_stats(&user("bob")).await.stats;
        assert_eq!(bob.books_read, 0);
        assert_eq!(bob.books_in_progress, 1);
        assert_eq!(bob.pages_read, 0);
    }

    #[test]
    fn tally_sums_duplicate_entries_for_the_same_day() {
        let alice = user("alice");
        let book = book_for(&alice, BookStatus::Reading, None);
        let entries = vec![log_for(&alice, book.id, 7), log_for(&alice, book.id, 8)];

        let stats = tally(alice, 12, &[book], &entries);
        assert_eq!(stats.pages_read, 15);
    }

    /// Changes the user's goal while the aggregator is fetching books.
    struct GoalChangedMidFetch {
        store: InMemoryStore,
        new_goal: u32,
    }

    #[async_trait]
    impl BookStore for GoalChangedMidFetch {
        async fn list_books(&self, user_id: &UserId) -> PortResult<Vec<Book>> {
            self.store.set_reading_goal(user_id, self.new_goal).await?;
            self.store.list_books(user_id).await
        }

        async fn get_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<Book> {
            self.store.get_book(user_id, book_id).await
        }

        async fn insert_book(&self, book: Book) -> PortResult<Book> {
            self.store.insert_book(book).await
        }

        async fn update_book(&self, book: Book) -> PortResult<Book> {
            self.store.update_book(book).await
        }

        async fn delete_book(&self, user_id: &UserId, book_id: Uuid) -> PortResult<()> {
            self.store.delete_book(user_id, book_id).await
        }
    }

    #[tokio::test]
    async fn goal_set_during_recompute_is_not_lost() {
        let store = InMemoryStore::new();
        let shared = Arc::new(store.clone());
        let books = Arc::new(GoalChangedMidFetch {
            store: store.clone(),
            new_goal: 40,
        });
        let aggregator = StatsAggregator::new(books, shared.clone(), shared);
        let alice = user("alice");

        let first = aggregator.get_stats(&alice).await;
        assert_eq!(first.stats.reading_goal, 12);
        assert_eq!(store.reading_goal(&alice).await.unwrap(), Some(40));

        let second = aggregator.get_stats(&alice).await;
        assert!(second.from_cache);
        assert_eq!(second.stats.reading_goal, 40);
    }
}
