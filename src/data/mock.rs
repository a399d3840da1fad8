use super::{MarketDataSource, StockPage};
use crate::config::MAX_HISTORY_DAYS;
use crate::errors::{AppError, Result};
use crate::models::{HistoricalPerformance, PerformancePoint, PriceRange, Stock};
use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// (symbol, company, sector, industry, exchange, reference price, market cap in billions)
const UNIVERSE: &[(&str, &str, &str, &str, &str, f64, f64)] = &[
    ("AAPL", "Apple Inc.", "Technology", "Consumer Electronics", "NASDAQ", 189.5, 2950.0),
    ("MSFT", "Microsoft Corporation", "Technology", "Software", "NASDAQ", 412.3, 3060.0),
    ("GOOGL", "Alphabet Inc.", "Communication Services", "Internet Content", "NASDAQ", 151.2, 1890.0),
    ("AMZN", "Amazon.com Inc.", "Consumer Cyclical", "Internet Retail", "NASDAQ", 178.9, 1860.0),
    ("NVDA", "NVIDIA Corporation", "Technology", "Semiconductors", "NASDAQ", 875.4, 2190.0),
    ("META", "Meta Platforms Inc.", "Communication Services", "Internet Content", "NASDAQ", 496.1, 1260.0),
    ("TSLA", "Tesla Inc.", "Consumer Cyclical", "Auto Manufacturers", "NASDAQ", 172.8, 550.0),
    ("JPM", "JPMorgan Chase & Co.", "Financial Services", "Banks", "NYSE", 198.4, 570.0),
    ("V", "Visa Inc.", "Financial Services", "Credit Services", "NYSE", 279.6, 575.0),
    ("JNJ", "Johnson & Johnson", "Healthcare", "Drug Manufacturers", "NYSE", 152.7, 367.0),
    ("WMT", "Walmart Inc.", "Consumer Defensive", "Discount Stores", "NYSE", 60.2, 485.0),
    ("PG", "Procter & Gamble Co.", "Consumer Defensive", "Household Products", "NYSE", 161.3, 380.0),
    ("XOM", "Exxon Mobil Corporation", "Energy", "Oil & Gas Integrated", "NYSE", 118.9, 470.0),
    ("CVX", "Chevron Corporation", "Energy", "Oil & Gas Integrated", "NYSE", 156.2, 290.0),
    ("KO", "Coca-Cola Co.", "Consumer Defensive", "Beverages", "NYSE", 60.8, 262.0),
    ("PFE", "Pfizer Inc.", "Healthcare", "Drug Manufacturers", "NYSE", 27.4, 155.0),
    ("INTC", "Intel Corporation", "Technology", "Semiconductors", "NASDAQ", 31.9, 135.0),
    ("T", "AT&T Inc.", "Communication Services", "Telecom Services", "NYSE", 17.1, 122.0),
    ("F", "Ford Motor Co.", "Consumer Cyclical", "Auto Manufacturers", "NYSE", 12.6, 50.0),
    ("BAC", "Bank of America Corp.", "Financial Services", "Banks", "NYSE", 37.8, 298.0),
    ("NEE", "NextEra Energy Inc.", "Utilities", "Utilities Regulated", "NYSE", 72.5, 149.0),
    ("DUK", "Duke Energy Corp.", "Utilities", "Utilities Regulated", "NYSE", 98.1, 76.0),
    ("CAT", "Caterpillar Inc.", "Industrials", "Farm & Heavy Machinery", "NYSE", 355.2, 174.0),
    ("BA", "Boeing Co.", "Industrials", "Aerospace & Defense", "NYSE", 182.4, 111.0),
    ("AMT", "American Tower Corp.", "Real Estate", "REIT Specialty", "NYSE", 191.7, 89.0),
    ("LIN", "Linde plc", "Basic Materials", "Specialty Chemicals", "NASDAQ", 461.0, 222.0),
    ("SIRI", "Sirius XM Holdings", "Communication Services", "Entertainment", "NASDAQ", 3.9, 15.0),
    ("NOK", "Nokia Oyj", "Technology", "Communication Equipment", "NYSE", 3.6, 20.0),
    ("BRK.A", "Berkshire Hathaway Inc.", "Financial Services", "Insurance Diversified", "NYSE", 615_000.0, 885.0),
    ("SNAP", "Snap Inc.", "Communication Services", "Internet Content", "NYSE", 11.2, 18.0),
];

struct MockState {
    rng: StdRng,
    /// Session quotes, drawn on first use and served until [`MockMarketData::regenerate`].
    snapshot: Option<Vec<Stock>>,
}

/// Synthetic market backed by a seeded random walk around reference prices.
pub struct MockMarketData {
    state: Mutex<MockState>,
    latency: Duration,
}

impl Default for MockMarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::with_rng_source(StdRng::from_entropy())
    }

    /// Reproducible quotes for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng_source(StdRng::seed_from_u64(seed))
    }

    fn with_rng_source(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(MockState {
                rng,
                snapshot: None,
            }),
            latency: Duration::ZERO,
        }
    }

    /// Simulated network delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn universe_len() -> usize {
        UNIVERSE.len()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Poisoned("mock market"))?;
        Ok(f(&mut state))
    }

    /// Session quotes for every listed company. Drawn once, then every
    /// list, page and overview request reads the same snapshot.
    pub fn generate_stocks(&self) -> Result<Vec<Stock>> {
        self.with_state(|state| {
            let MockState { rng, snapshot } = state;
            snapshot.get_or_insert_with(|| draw_quotes(rng)).clone()
        })
    }

    /// Replace the session snapshot with freshly drawn quotes.
    pub fn regenerate(&self) -> Result<Vec<Stock>> {
        self.with_state(|state| {
            let stocks = draw_quotes(&mut state.rng);
            state.snapshot = Some(stocks.clone());
            stocks
        })
    }

    pub fn generate_history(&self, symbol: &str, days: u32) -> Result<HistoricalPerformance> {
        let row = UNIVERSE
            .iter()
            .find(|row| row.0.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| AppError::NotFound(format!("symbol {symbol}")))?;
        let today = Utc::now().date_naive();
        let days = days.min(MAX_HISTORY_DAYS);
        let points = self.with_state(|state| random_walk(&mut state.rng, row.5, today, days))?;
        Ok(HistoricalPerformance::from_points(row.0, points))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Quote every listed company with a daily move of up to ±5%.
fn draw_quotes(rng: &mut StdRng) -> Vec<Stock> {
    UNIVERSE
        .iter()
        .enumerate()
        .map(|(idx, row)| quote(rng, idx as u32 + 1, row))
        .collect()
}

fn quote(rng: &mut StdRng, id: u32, row: &(&str, &str, &str, &str, &str, f64, f64)) -> Stock {
    let (symbol, company, sector, industry, exchange, reference, cap_billions) = *row;
    let previous_close = reference * rng.gen_range(0.97..1.03);
    let change_percent: f64 = rng.gen_range(-5.0..5.0);
    let price = round_cents(previous_close * (1.0 + change_percent / 100.0));
    let change = round_cents(price - previous_close);
    Stock {
        id,
        symbol: symbol.to_string(),
        company_name: company.to_string(),
        sector: sector.to_string(),
        industry: industry.to_string(),
        exchange: exchange.to_string(),
        price,
        change,
        change_percent: change / previous_close * 100.0,
        volume: rng.gen_range(500_000..80_000_000),
        market_cap: cap_billions * 1e9 * price / reference,
        price_range: PriceRange::for_price(price),
    }
}

/// `days` daily closes ending today, oldest first.
fn random_walk(rng: &mut StdRng, reference: f64, today: NaiveDate, days: u32) -> Vec<PerformancePoint> {
    let mut price = reference * rng.gen_range(0.85..1.15);
    let mut points = Vec::with_capacity(days as usize);
    for back in (0..days).rev() {
        let Some(date) = today.checked_sub_days(Days::new(back as u64)) else {
            continue;
        };
        price = (price * (1.0 + rng.gen_range(-0.03..0.03))).max(0.01);
        points.push(PerformancePoint {
            date,
            price: round_cents(price),
            volume: rng.gen_range(1_000_000..50_000_000),
        });
    }
    points
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl MarketDataSource for MockMarketData {
    async fn get_all_stocks(&self) -> Result<Vec<Stock>> {
        self.simulate_latency().await;
        self.generate_stocks()
    }

    async fn get_stocks_page(&self, offset: usize, limit: usize) -> Result<StockPage> {
        self.simulate_latency().await;
        let all = self.generate_stocks()?;
        let total = all.len();
        let stocks = all.into_iter().skip(offset).take(limit).collect();
        Ok(StockPage { stocks, total })
    }

    async fn get_historical_performance(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<HistoricalPerformance> {
        self.simulate_latency().await;
        self.generate_history(symbol, days)
    }
}
