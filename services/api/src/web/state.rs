//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use shelf_core::ports::{BookStore, CollectionStore, ReadingLogStore, StatsCache};
use shelf_core::{Collections, Library, StatsAggregator};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub collections: Arc<Collections>,
    pub stats: Arc<StatsAggregator>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the core services on top of one store that implements every port.
    pub fn from_store<S>(store: Arc<S>, config: Arc<Config>) -> Self
    where
        S: BookStore + ReadingLogStore + StatsCache + CollectionStore + 'static,
    {
        let stats = Arc::new(StatsAggregator::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let library = Arc::new(Library::new(store.clone(), store.clone(), stats.clone()));
        let collections = Arc::new(Collections::new(store.clone(), store));

        Self {
            library,
            collections,
            stats,
            config,
        }
    }
}
