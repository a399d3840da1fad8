//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:8080/ws";
pub const DEFAULT_STATE_DIR: &str = ".stock-dashboard";
pub const DEFAULT_SIMULATOR_BIND: &str = "127.0.0.1:8080";
/// Upper bound for `HISTORY_DAYS`; history sources clamp to it as well.
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// Storage key holding the JSON-encoded theme preference.
pub const THEME_STORAGE_KEY: &str = "stock-dashboard.theme";
/// Storage key holding the JSON-encoded watchlist.
pub const WATCHLIST_STORAGE_KEY: &str = "stock-dashboard.watchlist";

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// WebSocket endpoint of the real-time price feed.
    pub feed_url: String,
    /// Directory backing the persisted key/value store.
    pub state_dir: PathBuf,
    /// Batch size requested by the infinite list.
    pub page_size: usize,
    /// Days of history requested for the selected stock.
    pub history_days: u32,
    pub reconnect: ReconnectPolicy,
    /// Spawn the local feed simulator before connecting.
    pub simulate_feed: bool,
    pub simulator: SimulatorConfig,
}

/// Exponential backoff applied after an abnormal socket closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry; doubled for every consecutive retry.
    pub base_delay: Duration,
    /// Number of retries scheduled before the client gives up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub bind_addr: String,
    pub tick_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_SIMULATOR_BIND.to_string(),
            tick_interval: Duration::from_millis(2000),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            page_size: 20,
            history_days: 30,
            reconnect: ReconnectPolicy::default(),
            simulate_feed: true,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let feed_url = std::env::var("FEED_URL").unwrap_or(defaults.feed_url);
        url::Url::parse(&feed_url)?;

        let state_dir = std::env::var("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_dir);

        let page_size: usize = env_or("PAGE_SIZE", defaults.page_size)?;
        if page_size == 0 {
            return Err(AppError::Config("PAGE_SIZE must be positive".into()));
        }

        let reconnect = ReconnectPolicy {
            base_delay: Duration::from_millis(env_or(
                "RECONNECT_BASE_MS",
                defaults.reconnect.base_delay.as_millis() as u64,
            )?),
            max_attempts: env_or("RECONNECT_MAX_ATTEMPTS", defaults.reconnect.max_attempts)?,
        };

        let simulator = SimulatorConfig {
            bind_addr: std::env::var("SIMULATOR_BIND").unwrap_or(defaults.simulator.bind_addr),
            tick_interval: Duration::from_millis(env_or(
                "SIMULATOR_TICK_MS",
                defaults.simulator.tick_interval.as_millis() as u64,
            )?),
        };

        Ok(Self {
            feed_url,
            state_dir,
            page_size,
            history_days: check_history_days(env_or("HISTORY_DAYS", defaults.history_days)?)?,
            reconnect,
            simulate_feed: env_or("SIMULATE_FEED", defaults.simulate_feed)?,
            simulator,
        })
    }
}

fn check_history_days(days: u32) -> Result<u32> {
    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(AppError::Config(format!(
            "HISTORY_DAYS must be between 1 and {MAX_HISTORY_DAYS}, got {days}"
        )));
    }
    Ok(days)
}

/// Parse `key` from the environment, or return `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(default),
    }
}
