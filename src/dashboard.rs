//! Dashboard controller: the market view consumed by the console front-end.

use crate::data::MarketDataSource;
use crate::feed::FeedUpdate;
use crate::format::{ChangeTone, format_percent, format_price, format_volume};
use crate::models::{
    ConnectionStatus, HistoricalPerformance, MarketOverview, PerformancePoint, Stock,
};
use crate::state::AppState;
use crate::state::filters::{PriceRangeSummary, count_by_price_range, sector_options};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

pub struct Dashboard<S> {
    source: Arc<S>,
    pub state: AppState,
    stocks: Vec<Stock>,
    overview: Option<MarketOverview>,
    performance: Vec<PerformancePoint>,
    history: Option<HistoricalPerformance>,
    status: ConnectionStatus,
    error: Option<String>,
    history_days: u32,
}

impl<S: MarketDataSource> Dashboard<S> {
    pub fn new(source: Arc<S>, state: AppState, history_days: u32) -> Self {
        Self {
            source,
            state,
            stocks: Vec::new(),
            overview: None,
            performance: Vec::new(),
            history: None,
            status: ConnectionStatus::default(),
            error: None,
            history_days,
        }
    }

    /// Load stocks and overview from the data source.
    ///
    /// A failure leaves the previous data in place and sets the error shown
    /// to the user; [`Dashboard::retry`] repeats the load.
    pub async fn refresh(&mut self) -> bool {
        let stocks = match self.source.get_all_stocks().await {
            Ok(stocks) => stocks,
            Err(e) => {
                warn!(error = %e, "[DASH] stock load failed");
                self.error = Some(format!("Failed to load stocks: {e}"));
                return false;
            }
        };
        let overview = match self.source.get_market_overview().await {
            Ok(overview) => overview,
            Err(e) => {
                warn!(error = %e, "[DASH] overview load failed");
                self.error = Some(format!("Failed to load market overview: {e}"));
                return false;
            }
        };
        info!(count = stocks.len(), "[DASH] market data loaded");
        self.replace_stocks(stocks);
        self.overview = Some(overview);
        self.error = None;
        true
    }

    pub async fn retry(&mut self) -> bool {
        self.error = None;
        self.refresh().await
    }

    /// Select the stock with `symbol` and load its history.
    pub async fn select_symbol(&mut self, symbol: &str) -> bool {
        let Some(stock) = self
            .stocks
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
        else {
            self.error = Some(format!("Unknown symbol: {symbol}"));
            return false;
        };
        self.state.search.select(stock);
        self.load_history().await
    }

    /// Fetch history for the current selection, if any.
    pub async fn load_history(&mut self) -> bool {
        let Some(symbol) = self.state.search.selected().map(|s| s.symbol.clone()) else {
            self.history = None;
            return false;
        };
        match self
            .source
            .get_historical_performance(&symbol, self.history_days)
            .await
        {
            Ok(history) => {
                debug!(%symbol, points = history.points.len(), "[DASH] history loaded");
                self.history = Some(history);
                true
            }
            Err(e) => {
                warn!(%symbol, error = %e, "[DASH] history load failed");
                self.error = Some(format!("Failed to load history for {symbol}: {e}"));
                false
            }
        }
    }

    pub fn apply(&mut self, update: FeedUpdate) {
        match update {
            FeedUpdate::Stocks(stocks) => self.replace_stocks(stocks),
            FeedUpdate::Performance(points) => self.performance = points,
            FeedUpdate::Overview(overview) => self.overview = Some(overview),
            FeedUpdate::Status(status) => {
                if status.connected != self.status.connected {
                    info!(
                        connected = status.connected,
                        attempts = status.reconnect_attempts,
                        "[DASH] feed status changed"
                    );
                }
                self.status = status;
            }
        }
    }

    fn replace_stocks(&mut self, stocks: Vec<Stock>) {
        self.state.search.refresh_selection(&stocks);
        self.stocks = stocks;
    }
}

impl<S> Dashboard<S> {
    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn overview(&self) -> Option<&MarketOverview> {
        self.overview.as_ref()
    }

    pub fn performance(&self) -> &[PerformancePoint] {
        &self.performance
    }

    pub fn history(&self) -> Option<&HistoricalPerformance> {
        self.history.as_ref()
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Stocks passing the current query and filters.
    pub fn visible_stocks(&self) -> Vec<Stock> {
        self.state.search.apply(&self.stocks)
    }

    pub fn sectors(&self) -> Vec<String> {
        sector_options(&self.stocks)
    }

    pub fn price_ranges(&self) -> PriceRangeSummary {
        PriceRangeSummary::from_counts(&count_by_price_range(&self.stocks))
    }

    pub fn top_movers(&self, n: usize) -> TopMovers {
        TopMovers::from_stocks(&self.stocks, n)
    }

    /// One-line summary for the console.
    pub fn summary(&self) -> String {
        let feed = if self.status.connected { "live" } else { "offline" };
        let mut line = match &self.overview {
            Some(o) => format!(
                "{} stocks | {} up, {} down, {} flat | avg {} | feed {feed}",
                self.stocks.len(),
                o.advancing,
                o.declining,
                o.unchanged,
                format_percent(o.average_change),
            ),
            None => format!("{} stocks | feed {feed}", self.stocks.len()),
        };
        if let Some(selected) = self.state.search.selected() {
            line.push_str(&format!(" | {}", stock_line(selected)));
        }
        line
    }
}

/// `AAPL $190.12 ▲ +1.23% vol 12.35M`
pub fn stock_line(stock: &Stock) -> String {
    format!(
        "{} {} {} {} vol {}",
        stock.symbol,
        format_price(stock.price),
        ChangeTone::of(stock.change).arrow(),
        format_percent(stock.change_percent),
        format_volume(stock.volume),
    )
}

/// Largest gainers and losers by percent change.
#[derive(Debug, Clone, PartialEq)]
pub struct TopMovers {
    pub gainers: Vec<Stock>,
    pub losers: Vec<Stock>,
}

impl TopMovers {
    pub fn from_stocks(stocks: &[Stock], n: usize) -> Self {
        let mut sorted: Vec<&Stock> = stocks
            .iter()
            .filter(|s| s.change_percent.is_finite())
            .collect();
        sorted.sort_by(|a, b| {
            b.change_percent
                .partial_cmp(&a.change_percent)
                .unwrap_or(Ordering::Equal)
        });
        let gainers = sorted
            .iter()
            .filter(|s| s.change_percent > 0.0)
            .take(n)
            .map(|s| (*s).clone())
            .collect();
        let losers = sorted
            .iter()
            .rev()
            .filter(|s| s.change_percent < 0.0)
            .take(n)
            .map(|s| (*s).clone())
            .collect();
        Self { gainers, losers }
    }
}

/// Apply feed updates to the shared dashboard and log a summary every
/// `summary_every` until `shutdown` flips or the feed channel closes.
pub fn spawn_feed_loop<S: MarketDataSource + 'static>(
    dashboard: Arc<Mutex<Dashboard<S>>>,
    mut updates: mpsc::UnboundedReceiver<FeedUpdate>,
    summary_every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(summary_every);
        let mut applied: u64 = 0;
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(update) => {
                        dashboard.lock().await.apply(update);
                        applied += 1;
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let dash = dashboard.lock().await;
                    if let Some(error) = dash.error() {
                        warn!(%error, "[DASH] showing error");
                    }
                    info!(applied, "[DASH] {}", dash.summary());
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!(applied, "[DASH] feed loop stopped");
    })
}
