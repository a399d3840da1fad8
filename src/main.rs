use anyhow::Result;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use stock_dashboard::{
    config::AppConfig,
    dashboard::{Dashboard, spawn_feed_loop, stock_line},
    data::MockMarketData,
    feed::{ChannelHandler, RealtimeClient},
    format::format_market_cap,
    pager::InfiniteList,
    simulator::{self, SimulatedMarket},
    state::AppState,
    storage::FileStore,
    utils,
};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    tracing::info!(
        feed_url = %config.feed_url,
        state_dir = %config.state_dir.display(),
        page_size = config.page_size,
        "[INIT] stock-dashboard starting"
    );

    let storage = Arc::new(FileStore::open(&config.state_dir)?);
    let state = AppState::load(storage);
    tracing::info!(
        theme = ?state.theme.resolved(),
        watchlist = state.search.watchlist.len(),
        "[INIT] state restored"
    );

    let source = Arc::new(MockMarketData::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Simulated feed ---------------------------------------------------------
    let simulator_task = if config.simulate_feed {
        let listener = TcpListener::bind(&config.simulator.bind_addr).await?;
        let market = SimulatedMarket::new(source.generate_stocks()?, rand::random());
        let task = tokio::spawn(simulator::serve(
            listener,
            Arc::new(StdMutex::new(market)),
            config.simulator.clone(),
            shutdown_rx.clone(),
        ));
        Some(task)
    } else {
        None
    };

    // Stock list, one batch at a time ----------------------------------------
    let list = InfiniteList::new(source.clone(), config.page_size);
    list.refresh().await;
    let mut row = 0;
    while row < list.items().await.len() {
        list.item_visible(row).await;
        row += 1;
    }
    let progress = list.progress().await;
    tracing::info!(
        loaded = progress.current_count,
        total = progress.total,
        "[INIT] stock list loaded"
    );
    if let Some(error) = list.error().await {
        tracing::warn!(%error, "[INIT] stock list incomplete");
    }

    // Dashboard ---------------------------------------------------------------
    let mut dashboard = Dashboard::new(source.clone(), state, config.history_days);
    if !dashboard.refresh().await {
        dashboard.retry().await;
    }
    let movers = dashboard.top_movers(3);
    for stock in movers.gainers.iter().chain(&movers.losers) {
        tracing::info!(cap = %format_market_cap(stock.market_cap), "[DASH] mover {}", stock_line(stock));
    }
    if let Some(first) = dashboard.state.search.watchlist.stocks().first().cloned() {
        dashboard.select_symbol(&first.symbol).await;
    }
    let dashboard = Arc::new(Mutex::new(dashboard));

    // Real-time feed ----------------------------------------------------------
    let (handler, updates) = ChannelHandler::new();
    let feed = RealtimeClient::new(config.feed_url.clone(), config.reconnect, Arc::new(handler)).mount();
    let feed_loop = spawn_feed_loop(
        dashboard.clone(),
        updates,
        Duration::from_secs(10),
        shutdown_rx,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("[SHUTDOWN] unmounting feed client");
    feed.unmount().await;
    let _ = shutdown_tx.send(true);
    if let Err(e) = feed_loop.await {
        tracing::warn!(error = %e, "[SHUTDOWN] feed loop ended abnormally");
    }
    if let Some(task) = simulator_task {
        match task.await {
            Ok(Err(e)) => tracing::warn!(error = %e, "[SHUTDOWN] simulator failed"),
            Err(e) => tracing::warn!(error = %e, "[SHUTDOWN] simulator task ended abnormally"),
            Ok(Ok(())) => {}
        }
    }
    tracing::info!("{}", dashboard.lock().await.summary());
    Ok(())
}
