//! Local WebSocket server producing the simulated real-time feed.
//!
//! Each client receives an `initial` snapshot, then a `price_update` every
//! tick with prices nudged by a small random walk.

use crate::config::SimulatorConfig;
use crate::errors::Result;
use crate::feed::message::{INITIAL, InitialData, PRICE_UPDATE, PriceUpdateData, encode};
use crate::models::{MarketOverview, PerformancePoint, Stock};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Largest per-tick move, as a fraction of price.
const MAX_TICK_MOVE: f64 = 0.01;

/// Most recent session points kept and replayed to new clients.
pub const PERFORMANCE_WINDOW: usize = 500;

/// Shared market the simulator walks forward on every tick.
pub struct SimulatedMarket {
    stocks: Vec<Stock>,
    performance: VecDeque<PerformancePoint>,
    rng: StdRng,
}

impl SimulatedMarket {
    pub fn new(stocks: Vec<Stock>, seed: u64) -> Self {
        Self {
            stocks,
            performance: VecDeque::with_capacity(PERFORMANCE_WINDOW),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn initial(&self) -> InitialData {
        InitialData {
            stocks: Some(self.stocks.clone()),
            performance: Some(self.performance.iter().cloned().collect()),
            overview: Some(MarketOverview::from_stocks(&self.stocks)),
        }
    }

    /// Move every price and append the mean price to the session performance
    /// series, keeping the last [`PERFORMANCE_WINDOW`] points.
    pub fn tick(&mut self) -> Vec<Stock> {
        let rng = &mut self.rng;
        self.stocks = self
            .stocks
            .iter()
            .map(|s| {
                let factor = 1.0 + rng.gen_range(-MAX_TICK_MOVE..MAX_TICK_MOVE);
                let price = ((s.price * factor).max(0.01) * 100.0).round() / 100.0;
                let mut next = s.with_price(price);
                next.volume = s.volume + rng.gen_range(0..50_000);
                next
            })
            .collect();
        if !self.stocks.is_empty() {
            let mean = self.stocks.iter().map(|s| s.price).sum::<f64>() / self.stocks.len() as f64;
            let volume = self.stocks.iter().map(|s| s.volume).sum();
            if self.performance.len() == PERFORMANCE_WINDOW {
                self.performance.pop_front();
            }
            self.performance.push_back(PerformancePoint {
                date: Utc::now().date_naive(),
                price: mean,
                volume,
            });
        }
        self.stocks.clone()
    }
}

/// Accept feed clients on `listener` until `shutdown` flips to true.
pub async fn serve(
    listener: TcpListener,
    market: Arc<Mutex<SimulatedMarket>>,
    config: SimulatorConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "[SIM] feed simulator listening");

    // One ticker drives the market; connections subscribe to its updates.
    let (updates_tx, _) = tokio::sync::broadcast::channel::<String>(16);
    let ticker = {
        let market = market.clone();
        let updates_tx = updates_tx.clone();
        let mut shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.tick_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown.changed() => break,
                }
                let stocks = match market.lock() {
                    Ok(mut m) => m.tick(),
                    Err(_) => break,
                };
                match encode(PRICE_UPDATE, &PriceUpdateData { stocks }) {
                    Ok(text) => {
                        let _ = updates_tx.send(text);
                    }
                    Err(e) => warn!(error = %e, "[SIM] failed to encode update"),
                }
            }
        })
    };

    loop {
        let (stream, peer) = tokio::select! {
            res = listener.accept() => res?,
            _ = shutdown.changed() => break,
        };
        debug!(%peer, "[SIM] client connected");
        let initial = match market.lock() {
            Ok(m) => encode(INITIAL, &m.initial())?,
            Err(_) => break,
        };
        let updates = updates_tx.subscribe();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_client(stream, initial, updates, shutdown).await {
                debug!(%peer, error = %e, "[SIM] client session ended");
            }
        });
    }

    ticker.abort();
    info!("[SIM] feed simulator stopped");
    Ok(())
}

async fn serve_client(
    stream: TcpStream,
    initial: String,
    mut updates: tokio::sync::broadcast::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws.split();
    write.send(Message::Text(initial)).await?;
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(text) => write.send(Message::Text(text)).await?,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "[SIM] slow client skipped updates");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = shutdown.changed() => {
                write.send(Message::Close(None)).await?;
                break;
            }
        }
    }
    Ok(())
}
