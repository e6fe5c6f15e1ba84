//! Application configuration loaded from environment variables.
//!
//! All settings have sensible defaults; none are required:
//! - `LAMINA_WEBSOCKET_URL` — overrides the default feed endpoint
//! - `LAMINA_COIN` — asset whose per-order book to subscribe to
//! - `LAMINA_REBUILD_INTERVAL_MS` — view rebuild cadence in milliseconds
//! - `LAMINA_SNAPSHOT_FILE` — when set, the binary loads this snapshot
//!   offline instead of opening a live connection

/// Default public WebSocket endpoint.
const DEFAULT_WEBSOCKET_URL: &str = "wss://api.hyperliquid.xyz/ws";

/// Default coin to subscribe to.
const DEFAULT_COIN: &str = "BTC";

/// Default view rebuild cadence.
const DEFAULT_REBUILD_INTERVAL_MS: u64 = 100;

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub feed: FeedConfig,
}

/// Feed-specific configuration values.
#[derive(Debug)]
pub struct FeedConfig {
    pub websocket_url: String,
    pub coin: String,
    pub rebuild_interval_ms: u64,
    pub snapshot_file: Option<String>,
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`LaminaError::Config`](crate::LaminaError::Config) if
/// `LAMINA_REBUILD_INTERVAL_MS` is set but is not a positive integer.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let websocket_url = non_empty_var("LAMINA_WEBSOCKET_URL")
        .unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string());
    let coin = non_empty_var("LAMINA_COIN").unwrap_or_else(|| DEFAULT_COIN.to_string());

    let rebuild_interval_ms = match non_empty_var("LAMINA_REBUILD_INTERVAL_MS") {
        Some(raw) => match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => ms,
            _ => {
                return Err(crate::LaminaError::Config(format!(
                    "LAMINA_REBUILD_INTERVAL_MS must be a positive integer, got {raw:?}"
                )));
            }
        },
        None => DEFAULT_REBUILD_INTERVAL_MS,
    };

    let snapshot_file = non_empty_var("LAMINA_SNAPSHOT_FILE");

    Ok(AppConfig {
        feed: FeedConfig {
            websocket_url,
            coin,
            rebuild_interval_ms,
            snapshot_file,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
