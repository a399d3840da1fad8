//! Shared data structures used throughout the application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Quote snapshot for a single listed company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: u32,
    pub symbol: String,
    pub company_name: String,
    pub sector: String,
    pub industry: String,
    pub exchange: String,
    pub price: f64,
    /// Absolute change since the previous close.
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub market_cap: f64,
    pub price_range: PriceRange,
}

impl Stock {
    /// Re-price the snapshot, keeping `change` relative to the implied previous close.
    pub fn with_price(&self, price: f64) -> Self {
        let previous_close = self.price - self.change;
        let change = price - previous_close;
        let change_percent = if previous_close > 0.0 {
            change / previous_close * 100.0
        } else {
            0.0
        };
        let shares = if self.price > 0.0 {
            self.market_cap / self.price
        } else {
            0.0
        };
        Self {
            price,
            change,
            change_percent,
            market_cap: shares * price,
            price_range: PriceRange::for_price(price),
            ..self.clone()
        }
    }
}

/// Coarse display bucket derived from the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "Under $10")]
    Under10,
    #[serde(rename = "$10 - $50")]
    From10To50,
    #[serde(rename = "$50 - $100")]
    From50To100,
    #[serde(rename = "$100 - $500")]
    From100To500,
    #[serde(rename = "Over $500")]
    Over500,
}

impl PriceRange {
    pub const ALL: [PriceRange; 5] = [
        PriceRange::Under10,
        PriceRange::From10To50,
        PriceRange::From50To100,
        PriceRange::From100To500,
        PriceRange::Over500,
    ];

    /// Lower bounds are inclusive: exactly $10 lands in `$10 - $50`.
    pub fn for_price(price: f64) -> Self {
        match price {
            p if p < 10.0 => PriceRange::Under10,
            p if p < 50.0 => PriceRange::From10To50,
            p if p < 100.0 => PriceRange::From50To100,
            p if p < 500.0 => PriceRange::From100To500,
            _ => PriceRange::Over500,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceRange::Under10 => "Under $10",
            PriceRange::From10To50 => "$10 - $50",
            PriceRange::From50To100 => "$50 - $100",
            PriceRange::From100To500 => "$100 - $500",
            PriceRange::Over500 => "Over $500",
        }
    }
}

/// Breadth of the market at one refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketOverview {
    pub advancing: usize,
    pub declining: usize,
    pub unchanged: usize,
    pub total: usize,
    /// Mean `change_percent` across the list.
    pub average_change: f64,
}

impl MarketOverview {
    pub fn from_stocks(stocks: &[Stock]) -> Self {
        let mut overview = MarketOverview {
            total: stocks.len(),
            ..Default::default()
        };
        for stock in stocks {
            if stock.change > 0.0 {
                overview.advancing += 1;
            } else if stock.change < 0.0 {
                overview.declining += 1;
            } else {
                overview.unchanged += 1;
            }
        }
        if !stocks.is_empty() {
            overview.average_change =
                stocks.iter().map(|s| s.change_percent).sum::<f64>() / stocks.len() as f64;
        }
        overview
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: u64,
}

/// Price history of one symbol with summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPerformance {
    pub symbol: String,
    pub points: Vec<PerformancePoint>,
    pub start_price: f64,
    pub end_price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub high: f64,
    pub low: f64,
    pub average_volume: f64,
}

impl HistoricalPerformance {
    /// Build the summary from an ordered series. An empty series yields zeroed metrics.
    pub fn from_points(symbol: &str, points: Vec<PerformancePoint>) -> Self {
        let start_price = points.first().map(|p| p.price).unwrap_or_default();
        let end_price = points.last().map(|p| p.price).unwrap_or_default();
        let change = end_price - start_price;
        let change_percent = if start_price > 0.0 {
            change / start_price * 100.0
        } else {
            0.0
        };
        let (high, low) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            points.iter().fold((f64::MIN, f64::MAX), |(hi, lo), p| {
                (hi.max(p.price), lo.min(p.price))
            })
        };
        let average_volume = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.volume as f64).sum::<f64>() / points.len() as f64
        };
        Self {
            symbol: symbol.to_string(),
            points,
            start_price,
            end_price,
            change,
            change_percent,
            high,
            low,
            average_volume,
        }
    }
}

/// Snapshot of the real-time connection reported to status listeners.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub reconnect_attempts: u32,
}
