use crate::models::{ConnectionStatus, MarketOverview, PerformancePoint, Stock};
use tokio::sync::mpsc;

/// Callbacks invoked by the real-time client. Every method defaults to a no-op.
pub trait FeedHandler: Send + Sync {
    fn on_stocks(&self, _stocks: Vec<Stock>) {}
    fn on_performance(&self, _points: Vec<PerformancePoint>) {}
    fn on_overview(&self, _overview: MarketOverview) {}
    fn on_status(&self, _status: ConnectionStatus) {}
}

/// A callback invocation captured as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    Stocks(Vec<Stock>),
    Performance(Vec<PerformancePoint>),
    Overview(MarketOverview),
    Status(ConnectionStatus),
}

/// Forwards every callback into an unbounded channel for an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<FeedUpdate>,
}

impl ChannelHandler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FeedUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, update: FeedUpdate) {
        // Receiver gone means the consumer shut down first; nothing to do.
        let _ = self.tx.send(update);
    }
}

impl FeedHandler for ChannelHandler {
    fn on_stocks(&self, stocks: Vec<Stock>) {
        self.forward(FeedUpdate::Stocks(stocks));
    }

    fn on_performance(&self, points: Vec<PerformancePoint>) {
        self.forward(FeedUpdate::Performance(points));
    }

    fn on_overview(&self, overview: MarketOverview) {
        self.forward(FeedUpdate::Overview(overview));
    }

    fn on_status(&self, status: ConnectionStatus) {
        self.forward(FeedUpdate::Status(status));
    }
}
