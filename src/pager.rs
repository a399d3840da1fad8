//! Infinite list over the stock universe.
//!
//! The consumer reports which row it is about to render via
//! [`InfiniteList::item_visible`]; once that row is within the trailing
//! margin the next batch is fetched. At most one fetch runs at a time.
//! A refresh waits for the running fetch and discards its batch.

use crate::data::MarketDataSource;
use crate::models::Stock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How many trailing rows trigger the next fetch.
pub const DEFAULT_TRIGGER_MARGIN: usize = 1;

/// Progress numbers exposed to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub has_more: bool,
    pub total: usize,
    pub current_count: usize,
}

#[derive(Debug, Default)]
struct ListState {
    items: Vec<Stock>,
    offset: usize,
    has_more: bool,
    total: usize,
    error: Option<String>,
    /// Bumped by every refresh; batches requested under an older value are dropped.
    generation: u64,
}

pub struct InfiniteList<S> {
    source: Arc<S>,
    page_size: usize,
    trigger_margin: usize,
    state: Mutex<ListState>,
    fetch_gate: Mutex<()>,
}

impl<S: MarketDataSource> InfiniteList<S> {
    pub fn new(source: Arc<S>, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            trigger_margin: DEFAULT_TRIGGER_MARGIN,
            state: Mutex::new(ListState {
                has_more: true,
                ..Default::default()
            }),
            fetch_gate: Mutex::new(()),
        }
    }

    pub fn with_trigger_margin(mut self, margin: usize) -> Self {
        self.trigger_margin = margin.max(1);
        self
    }

    /// Fetch the next batch, or the first one when `reset` is set.
    ///
    /// Returns false without fetching while another fetch is in flight or,
    /// for a non-reset fetch, when the list is exhausted.
    pub async fn fetch(&self, reset: bool) -> bool {
        let Ok(_gate) = self.fetch_gate.try_lock() else {
            debug!("[PAGER] fetch suppressed, one already in flight");
            return false;
        };
        self.fetch_locked(reset).await
    }

    /// Caller must hold `fetch_gate`.
    async fn fetch_locked(&self, reset: bool) -> bool {
        let (offset, generation) = {
            let state = self.state.lock().await;
            if !reset && !state.has_more {
                return false;
            }
            (if reset { 0 } else { state.offset }, state.generation)
        };

        let result = self.source.get_stocks_page(offset, self.page_size).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!(offset, "[PAGER] dropping batch requested before refresh");
            return false;
        }
        match result {
            Ok(page) => {
                let received = page.stocks.len();
                if reset {
                    state.items = page.stocks;
                } else {
                    state.items.extend(page.stocks);
                }
                state.offset = offset + received;
                state.total = page.total;
                state.has_more = received > 0 && state.offset < page.total;
                state.error = None;
                debug!(
                    offset,
                    received,
                    total = page.total,
                    has_more = state.has_more,
                    "[PAGER] batch loaded"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, offset, "[PAGER] batch failed");
                state.error = Some(format!("Failed to load stocks: {e}"));
                false
            }
        }
    }

    pub async fn load_more(&self) -> bool {
        self.fetch(false).await
    }

    /// Drop everything loaded so far and fetch from the start.
    ///
    /// Waits for a fetch already in flight; that fetch's batch is discarded.
    pub async fn refresh(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            state.items.clear();
            state.offset = 0;
            state.total = 0;
            state.has_more = true;
            state.error = None;
            state.generation += 1;
        }
        let _gate = self.fetch_gate.lock().await;
        self.fetch_locked(true).await
    }

    /// Consumer-pull trigger: the row at `index` is about to be shown.
    pub async fn item_visible(&self, index: usize) -> bool {
        let near_end = {
            let state = self.state.lock().await;
            state.has_more && index + self.trigger_margin >= state.items.len()
        };
        near_end && self.load_more().await
    }

    pub async fn items(&self) -> Vec<Stock> {
        self.state.lock().await.items.clone()
    }

    pub async fn progress(&self) -> Progress {
        let state = self.state.lock().await;
        Progress {
            has_more: state.has_more,
            total: state.total,
            current_count: state.items.len(),
        }
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_gate.try_lock().is_err()
    }
}
