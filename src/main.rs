use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use lamina::LaminaError;
use lamina::config::fetch_config;
use lamina::engine::{Engine, EngineCommand, EngineConfig, EngineMessage};

#[tokio::main]
async fn main() -> Result<(), LaminaError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;
    let feed = app_config.feed;

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let engine = Engine::new(
        EngineConfig {
            rebuild_interval: Duration::from_millis(feed.rebuild_interval_ms),
        },
        msg_tx,
        cmd_rx,
    );
    tokio::spawn(engine.run());

    let offline = feed.snapshot_file.is_some();
    if let Some(path) = &feed.snapshot_file {
        let bytes = std::fs::read(path)
            .map_err(|e| LaminaError::Config(format!("cannot read {path}: {e}")))?;
        let size_hint = Some(bytes.len() as u64);
        let _ = cmd_tx.send(EngineCommand::LoadSnapshot { bytes, size_hint });
    } else {
        let _ = cmd_tx.send(EngineCommand::Connect {
            url: feed.websocket_url.clone(),
            coin: feed.coin.clone(),
        });
    }

    while let Some(message) = msg_rx.recv().await {
        match message {
            EngineMessage::Status { status, detail } => {
                info!(status = status.as_str(), detail = detail.as_deref(), "Status");
            }
            EngineMessage::SnapshotReady { view, metrics } => {
                info!(
                    orders = metrics.live_orders,
                    bid_levels = metrics.bid_levels,
                    ask_levels = metrics.ask_levels,
                    tick_size = view.heatmap.tick_size,
                    "First view ready"
                );
            }
            EngineMessage::ViewUpdated { metrics, .. } => {
                info!(
                    orders = metrics.live_orders,
                    diffs = metrics.diffs_applied,
                    messages = metrics.messages_received,
                    rebuild_us = metrics.rebuild_time.as_micros() as u64,
                    "View updated"
                );
            }
            EngineMessage::LoadResult { view, metrics } => {
                info!(
                    orders = metrics.orders,
                    bid_levels = metrics.bid_levels,
                    ask_levels = metrics.ask_levels,
                    file_size = metrics.file_size,
                    parse_us = metrics.parse_time.as_micros() as u64,
                    transform_us = metrics.transform_time.as_micros() as u64,
                    tick_size = view.heatmap.tick_size,
                    "Snapshot loaded"
                );
                if offline {
                    break;
                }
            }
            EngineMessage::LoadFailed { reason } => {
                warn!(reason, "Snapshot load failed");
                if offline {
                    break;
                }
            }
        }
    }

    Ok(())
}
