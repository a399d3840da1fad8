use super::filters::FilterOptions;
use super::watchlist::Watchlist;
use crate::models::Stock;
use crate::storage::KeyValueStore;
use std::sync::Arc;

/// Query, filters, selection and watchlist shared by the dashboard views.
pub struct SearchStore {
    query: String,
    filters: FilterOptions,
    selected: Option<Stock>,
    pub watchlist: Watchlist,
}

impl SearchStore {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            query: String::new(),
            filters: FilterOptions::default(),
            selected: None,
            watchlist: Watchlist::load(storage),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn filters(&self) -> &FilterOptions {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: FilterOptions) {
        self.filters = filters;
    }

    pub fn update_filters(&mut self, f: impl FnOnce(&mut FilterOptions)) {
        f(&mut self.filters);
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterOptions::default();
    }

    pub fn selected(&self) -> Option<&Stock> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, stock: Stock) {
        self.selected = Some(stock);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Case-insensitive match on symbol or company name; blank queries match everything.
    pub fn matches_query(&self, stock: &Stock) -> bool {
        let needle = self.query.trim().to_lowercase();
        needle.is_empty()
            || stock.symbol.to_lowercase().contains(&needle)
            || stock.company_name.to_lowercase().contains(&needle)
    }

    /// Stocks passing both the query and the active filters, in input order.
    pub fn apply(&self, stocks: &[Stock]) -> Vec<Stock> {
        stocks
            .iter()
            .filter(|s| self.matches_query(s) && self.filters.matches(s))
            .cloned()
            .collect()
    }

    /// Swap the selected snapshot for its fresh quote, if the update carries one.
    pub fn refresh_selection(&mut self, stocks: &[Stock]) {
        if let Some(selected) = self.selected.as_mut() {
            if let Some(fresh) = stocks.iter().find(|s| s.id == selected.id) {
                *selected = fresh.clone();
            }
        }
    }
}
