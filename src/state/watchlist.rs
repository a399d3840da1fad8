use crate::config::WATCHLIST_STORAGE_KEY;
use crate::models::Stock;
use crate::storage::{KeyValueStore, load_json, save_json};
use std::sync::Arc;
use tracing::warn;

/// User-curated stocks, keyed by id and kept in insertion order.
pub struct Watchlist {
    stocks: Vec<Stock>,
    storage: Arc<dyn KeyValueStore>,
}

impl Watchlist {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let stocks = match load_json::<Vec<Stock>>(storage.as_ref(), WATCHLIST_STORAGE_KEY) {
            Ok(Some(stocks)) => stocks,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "[STORE] stored watchlist unreadable, starting empty");
                Vec::new()
            }
        };
        Self { stocks, storage }
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.stocks.iter().any(|s| s.id == id)
    }

    /// Returns false when the stock is already present.
    pub fn add(&mut self, stock: Stock) -> bool {
        if self.contains(stock.id) {
            return false;
        }
        self.stocks.push(stock);
        self.persist();
        true
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.stocks.len();
        self.stocks.retain(|s| s.id != id);
        let removed = self.stocks.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Add when absent, remove when present. Returns membership after the call.
    pub fn toggle(&mut self, stock: Stock) -> bool {
        if self.remove(stock.id) {
            false
        } else {
            self.add(stock)
        }
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.storage.as_ref(), WATCHLIST_STORAGE_KEY, &self.stocks) {
            warn!(error = %e, "[STORE] failed to persist watchlist");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::stock;
    use crate::storage::{FileStore, MemoryStore, temp_state_dir};

    #[test]
    fn add_is_idempotent_by_id() {
        let mut list = Watchlist::load(Arc::new(MemoryStore::new()));
        assert!(list.add(stock(1, "AAPL", 190.0, 1.0)));
        assert!(!list.add(stock(1, "AAPL", 191.0, 2.0)));
        assert_eq!(list.len(), 1);
        assert_eq!(list.stocks()[0].price, 190.0);
    }

    #[test]
    fn keeps_insertion_order_after_removal() {
        let mut list = Watchlist::load(Arc::new(MemoryStore::new()));
        list.add(stock(3, "C", 1.0, 0.0));
        list.add(stock(1, "A", 1.0, 0.0));
        list.add(stock(2, "B", 1.0, 0.0));
        assert!(list.remove(1));
        assert!(!list.remove(1));
        let ids: Vec<u32> = list.stocks().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut list = Watchlist::load(Arc::new(MemoryStore::new()));
        assert!(list.toggle(stock(5, "E", 1.0, 0.0)));
        assert!(!list.toggle(stock(5, "E", 1.0, 0.0)));
        assert!(list.is_empty());
    }

    #[test]
    fn persists_across_sessions_on_disk() {
        let dir = temp_state_dir("watchlist");
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&dir).unwrap());
        {
            let mut list = Watchlist::load(storage.clone());
            list.add(stock(1, "AAPL", 190.0, 1.0));
            list.add(stock(2, "MSFT", 410.0, -3.0));
        }
        let reloaded = Watchlist::load(storage);
        assert!(reloaded.contains(1));
        assert!(reloaded.contains(2));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_payload_starts_empty() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(WATCHLIST_STORAGE_KEY, "{broken").unwrap();
        assert!(Watchlist::load(storage).is_empty());
    }
}
