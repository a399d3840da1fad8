//! Data access layer.
//!
//! The dashboard only depends on [`MarketDataSource`]; the bundled
//! implementation is [`MockMarketData`], which synthesises quotes.

use crate::errors::Result;
use crate::models::{HistoricalPerformance, MarketOverview, Stock};
use async_trait::async_trait;

pub mod mock;

pub use mock::MockMarketData;

/// One batch of the stock list and the size of the full list.
#[derive(Debug, Clone, PartialEq)]
pub struct StockPage {
    pub stocks: Vec<Stock>,
    pub total: usize,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_all_stocks(&self) -> Result<Vec<Stock>>;

    /// Stocks `offset..offset + limit` of the full list.
    async fn get_stocks_page(&self, offset: usize, limit: usize) -> Result<StockPage> {
        let all = self.get_all_stocks().await?;
        let total = all.len();
        let stocks = all.into_iter().skip(offset).take(limit).collect();
        Ok(StockPage { stocks, total })
    }

    async fn get_market_overview(&self) -> Result<MarketOverview> {
        let stocks = self.get_all_stocks().await?;
        Ok(MarketOverview::from_stocks(&stocks))
    }

    async fn get_historical_performance(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<HistoricalPerformance>;
}
