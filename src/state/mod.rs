//! Application state: theme, search/filter selection and the watchlist.
//!
//! Stores mutate in memory and write through to an injected
//! [`KeyValueStore`](crate::storage::KeyValueStore).

pub mod filters;
pub mod search;
pub mod theme;
pub mod watchlist;

pub use filters::{FilterOptions, NumericRange, PriceRangeSummary};
pub use search::SearchStore;
pub use theme::{Theme, ThemePreference, ThemeStore};
pub use watchlist::Watchlist;

use crate::storage::KeyValueStore;
use std::sync::Arc;

/// Process-wide state passed by reference to consumers.
pub struct AppState {
    pub theme: ThemeStore,
    pub search: SearchStore,
}

impl AppState {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            theme: ThemeStore::load(storage.clone()),
            search: SearchStore::load(storage),
        }
    }
}
