//! The book engine: a single task owning the live connection, the order
//! store, and the rebuild scheduler.
//!
//! The engine communicates with its caller exclusively over channels:
//! [`EngineCommand`] in, [`EngineMessage`] out. Inside the task a single
//! `select!` loop serializes transport messages, control commands, the
//! rebuild timer, and the reconnect deadline, so every store mutation and
//! view build runs to completion without locking. Completed views cross the
//! channel by move.

pub mod scheduler;
pub mod session;

use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Instant as TokioInstant, Interval};
use tracing::{debug, info, warn};
use tungstenite::Message as WsMessage;

use crate::book::store::OrderStore;
use crate::book::view::{self, BookView};
use crate::book::{Side, infer_tick_size};
use crate::models::order::OrderStatus;
use crate::models::snapshot::WireSnapshot;
use crate::models::{self, FeedEvent, diff::WireDiff};
use crate::websocket::{self, WsReader, WsWriter};

use self::scheduler::{DEFAULT_REBUILD_INTERVAL, RebuildScheduler};
use self::session::{Session, SessionStatus};

/// Control messages from the caller to the engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Open the transport and subscribe to `coin`'s per-order book.
    Connect { url: String, coin: String },
    /// Tear down the session and return to idle.
    Disconnect,
    /// Change the rebuild timer cadence.
    SetRebuildInterval(Duration),
    /// One-shot offline build from a raw snapshot payload.
    LoadSnapshot {
        bytes: Vec<u8>,
        size_hint: Option<u64>,
    },
}

/// Messages emitted by the engine to the caller.
#[derive(Debug)]
pub enum EngineMessage {
    /// Session status transition.
    Status {
        status: SessionStatus,
        detail: Option<String>,
    },
    /// First rebuilt view after a (re)subscribe.
    SnapshotReady {
        view: BookView,
        metrics: RebuildMetrics,
    },
    /// Every subsequent rebuild.
    ViewUpdated {
        view: BookView,
        metrics: RebuildMetrics,
    },
    /// Offline load finished.
    LoadResult {
        view: BookView,
        metrics: LoadMetrics,
    },
    /// Offline load failed; no partial view is emitted.
    LoadFailed { reason: String },
}

/// Counters surfaced with every streaming rebuild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebuildMetrics {
    pub live_orders: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub rebuild_time: Duration,
    pub diffs_applied: u64,
    pub messages_received: u64,
    pub rebuild_interval: Duration,
}

/// Timings and counts surfaced with an offline load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadMetrics {
    pub file_size: u64,
    pub parse_time: Duration,
    pub transform_time: Duration,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub orders: usize,
}

/// Configuration for a newly created engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rebuild_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rebuild_interval: DEFAULT_REBUILD_INTERVAL,
        }
    }
}

/// The feed endpoint the caller asked for; kept across reconnect cycles.
struct Target {
    url: String,
    coin: String,
}

/// Both halves of a live transport connection. Dropping it detaches the
/// stream, so a torn-down connection can never deliver another event.
struct Conn {
    /// Sink half; held so the connection stays open after the subscribe.
    _writer: WsWriter,
    reader: WsReader,
}

/// Single-task book engine; see the module docs for the concurrency model.
pub struct Engine {
    tx: mpsc::UnboundedSender<EngineMessage>,
    cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
    store: OrderStore,
    scheduler: RebuildScheduler,
    session: Session,
    target: Option<Target>,
    conn: Option<Conn>,
    reconnect_at: Option<TokioInstant>,
    tick_size: Option<f64>,
    first_view_pending: bool,
}

impl Engine {
    /// Creates an engine wired to the given channels.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        tx: mpsc::UnboundedSender<EngineMessage>,
        cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
    ) -> Self {
        Self {
            tx,
            cmd_rx,
            store: OrderStore::new(),
            scheduler: RebuildScheduler::new(config.rebuild_interval),
            session: Session::new(),
            target: None,
            conn: None,
            reconnect_at: None,
            tick_size: None,
            first_view_pending: false,
        }
    }

    /// Runs the engine until the command channel closes.
    ///
    /// An explicit [`EngineCommand::Disconnect`] returns the session to idle
    /// but keeps the loop alive for later commands; dropping the command
    /// sender shuts the engine down.
    pub async fn run(mut self) {
        let mut ticker = make_ticker(self.scheduler.interval());

        loop {
            let reconnect_at = self.reconnect_at;

            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(EngineCommand::SetRebuildInterval(interval)) => {
                            self.scheduler.set_interval(interval);
                            ticker = make_ticker(interval);
                            debug!(interval_ms = interval.as_millis() as u64, "Rebuild interval changed");
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("Command channel closed, engine stopping");
                            return;
                        }
                    }
                }

                msg = read_next(&mut self.conn) => {
                    self.handle_transport(msg);
                }

                _ = ticker.tick() => {
                    self.on_tick();
                }

                () = reconnect_due(reconnect_at), if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.try_connect().await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Connect { url, coin } => {
                self.target = Some(Target { url, coin });
                self.reconnect_at = None;
                self.scheduler.reset();
                self.try_connect().await;
            }
            EngineCommand::Disconnect => self.disconnect(),
            EngineCommand::LoadSnapshot { bytes, size_hint } => {
                self.load_snapshot(&bytes, size_hint);
            }
            // Handled in the run loop, where the timer lives.
            EngineCommand::SetRebuildInterval(_) => {}
        }
    }

    /// One connection attempt against the current target. On success the
    /// subscribe request is sent immediately and the session counts as
    /// subscribed without waiting for a server ack.
    async fn try_connect(&mut self) {
        let Some(target) = &self.target else {
            return;
        };
        let (url, coin) = (target.url.clone(), target.coin.clone());

        self.emit_status(SessionStatus::Connecting, None);
        info!(%url, %coin, "Connecting to feed");

        match websocket::connect(&url).await {
            Ok((mut writer, reader)) => {
                self.session.opened();
                self.emit_status(SessionStatus::Connected, None);

                match websocket::subscribe(&mut writer, &coin).await {
                    Ok(()) => {
                        self.conn = Some(Conn { _writer: writer, reader });
                        self.first_view_pending = true;
                        self.scheduler.start();
                        self.emit_status(SessionStatus::Subscribed, None);
                    }
                    Err(e) => {
                        warn!("Subscribe failed: {e}");
                        self.schedule_reconnect(SessionStatus::Error, Some(e.to_string()));
                    }
                }
            }
            Err(e) => {
                warn!("Connection failed: {e}");
                self.schedule_reconnect(SessionStatus::Error, Some(e.to_string()));
            }
        }
    }

    /// Tears down the transport and arms the backoff timer.
    fn schedule_reconnect(&mut self, status: SessionStatus, detail: Option<String>) {
        self.conn = None;
        self.scheduler.stop();
        self.emit_status(status, detail);

        let delay = self.session.next_backoff();
        info!(delay_ms = delay.as_millis() as u64, "Backing off before reconnect");
        self.reconnect_at = Some(TokioInstant::now() + delay);
    }

    /// Explicit caller disconnect: detach the transport, clear all session
    /// state, and return to idle. Dropping the stream halves first means no
    /// further transport event can mutate state.
    fn disconnect(&mut self) {
        self.conn = None;
        self.reconnect_at = None;
        self.target = None;
        self.scheduler.reset();
        self.store.clear();
        self.tick_size = None;
        self.first_view_pending = false;
        self.session.opened();
        self.emit_status(SessionStatus::Idle, None);
        info!("Disconnected, session state cleared");
    }

    fn handle_transport(&mut self, msg: Option<Result<WsMessage, tungstenite::Error>>) {
        match msg {
            Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),
            Some(Ok(WsMessage::Close(_))) | None => {
                warn!("WebSocket stream ended");
                self.schedule_reconnect(SessionStatus::Disconnected, None);
            }
            Some(Ok(_)) => {} // Binary/Ping/Pong frames
            Some(Err(e)) => {
                warn!("WebSocket error: {e}");
                self.schedule_reconnect(SessionStatus::Error, Some(e.to_string()));
            }
        }
    }

    /// Classifies and applies one text frame. Malformed frames are dropped;
    /// the stream recovers on the next message.
    fn handle_text(&mut self, text: &str) {
        self.scheduler.record_message();
        match models::classify(text) {
            Ok(FeedEvent::Snapshot(snapshot)) => self.apply_snapshot(&snapshot),
            Ok(FeedEvent::Diff(diff)) => self.apply_diff(&diff),
            Ok(FeedEvent::Ignored) => debug!("Ignoring non-book message"),
            Err(e) => warn!("Dropping malformed message: {e}"),
        }
    }

    fn apply_snapshot(&mut self, snapshot: &WireSnapshot) {
        let mut orders = Vec::with_capacity(snapshot.levels.0.len() + snapshot.levels.1.len());
        for raw in snapshot.records() {
            if raw.is_untriggered() {
                continue;
            }
            match raw.to_order() {
                Ok(order) => orders.push(order),
                Err(e) => warn!(oid = raw.oid, "Skipping snapshot record: {e}"),
            }
        }

        self.tick_size = Some(infer_tick_size(orders.iter().map(|o| o.price)));
        self.store.reset(orders);
        if self.store.take_dirty() {
            self.scheduler.mark_dirty();
        }
        debug!(
            coin = %snapshot.coin,
            height = snapshot.height,
            orders = self.store.len(),
            tick_size = self.tick_size,
            "Snapshot applied"
        );
    }

    fn apply_diff(&mut self, diff: &WireDiff) {
        let mut applied = 0u64;
        for entry in &diff.order_statuses {
            if entry.status == OrderStatus::Open {
                // Untriggered conditionals are not resting orders yet.
                if entry.order.is_untriggered() {
                    continue;
                }
                match entry.order.to_order() {
                    Ok(order) => {
                        self.store.upsert(order);
                        applied += 1;
                    }
                    Err(e) => warn!(oid = entry.order.oid, "Skipping diff record: {e}"),
                }
            } else if entry.status.is_terminal() {
                // Unknown ids are expected: the feed is not exactly-once.
                if self.store.remove(entry.order.oid) {
                    applied += 1;
                }
            }
            // Rejections and other statuses never affected book state.
        }

        if applied > 0 {
            self.scheduler.record_diffs(applied);
        }
        if self.store.take_dirty() {
            self.scheduler.mark_dirty();
        }
    }

    /// One rebuild timer tick. A no-op unless diffs arrived since the last
    /// rebuild.
    fn on_tick(&mut self) {
        if !self.scheduler.should_rebuild() {
            return;
        }

        let tick_size = self.tick_size.unwrap_or(1.0);
        let (view, elapsed) = view::build(&self.store, tick_size);
        let metrics = RebuildMetrics {
            live_orders: self.store.len(),
            bid_levels: self.store.level_count(Side::Bid),
            ask_levels: self.store.level_count(Side::Ask),
            rebuild_time: elapsed,
            diffs_applied: self.scheduler.take_diffs_applied(),
            messages_received: self.scheduler.messages_received(),
            rebuild_interval: self.scheduler.interval(),
        };

        let message = if self.first_view_pending {
            self.first_view_pending = false;
            EngineMessage::SnapshotReady { view, metrics }
        } else {
            EngineMessage::ViewUpdated { view, metrics }
        };
        let _ = self.tx.send(message);
    }

    /// Offline one-shot path: parse a standalone snapshot payload into an
    /// ephemeral store and run the same aggregation as the streaming path.
    /// The session store is never touched.
    fn load_snapshot(&mut self, bytes: &[u8], size_hint: Option<u64>) {
        let parse_started = Instant::now();
        let snapshot: WireSnapshot = match serde_json::from_slice(bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let _ = self.tx.send(EngineMessage::LoadFailed {
                    reason: format!("unparseable snapshot: {e}"),
                });
                return;
            }
        };

        let mut orders = Vec::with_capacity(snapshot.levels.0.len() + snapshot.levels.1.len());
        for raw in snapshot.records() {
            if raw.is_untriggered() {
                continue;
            }
            match raw.to_order() {
                Ok(order) => orders.push(order),
                Err(e) => {
                    // No follow-up message can repair a static file.
                    let _ = self.tx.send(EngineMessage::LoadFailed {
                        reason: e.to_string(),
                    });
                    return;
                }
            }
        }
        let parse_time = parse_started.elapsed();

        let transform_started = Instant::now();
        let mut scratch = OrderStore::new();
        scratch.reset(orders);
        let tick_size = infer_tick_size(scratch.occupied_prices());
        let (view, _) = view::build(&scratch, tick_size);
        let transform_time = transform_started.elapsed();

        let metrics = LoadMetrics {
            file_size: size_hint.unwrap_or(bytes.len() as u64),
            parse_time,
            transform_time,
            bid_levels: scratch.level_count(Side::Bid),
            ask_levels: scratch.level_count(Side::Ask),
            orders: scratch.len(),
        };
        info!(
            coin = %snapshot.coin,
            orders = metrics.orders,
            "Offline snapshot loaded"
        );
        let _ = self.tx.send(EngineMessage::LoadResult { view, metrics });
    }

    fn emit_status(&mut self, status: SessionStatus, detail: Option<String>) {
        if let Some(next) = self.session.transition(status) {
            info!(status = next.as_str(), "Session status");
            let _ = self.tx.send(EngineMessage::Status {
                status: next,
                detail,
            });
        }
    }
}

fn make_ticker(period: Duration) -> Interval {
    tokio::time::interval_at(TokioInstant::now() + period, period)
}

/// Reads the next frame from the live connection, or parks forever when
/// there is none (the select loop stays driven by the other branches).
async fn read_next(conn: &mut Option<Conn>) -> Option<Result<WsMessage, tungstenite::Error>> {
    match conn {
        Some(conn) => conn.reader.next().await,
        None => std::future::pending().await,
    }
}

/// Sleeps until the armed reconnect deadline; pending when disarmed.
async fn reconnect_due(deadline: Option<TokioInstant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
