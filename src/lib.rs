//! Core library for the stock-dashboard client.
//!
//! Application state (theme, search, watchlist), the market data layer, the
//! infinite-list loader and the real-time feed client live here; `main.rs`
//! wires them into a console dashboard.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod errors;
pub mod feed;
pub mod format;
pub mod models;
pub mod pager;
pub mod simulator;
pub mod state;
pub mod storage;
pub mod utils;
