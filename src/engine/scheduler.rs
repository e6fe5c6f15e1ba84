//! Dirty-flag plus fixed-interval rebuild scheduling.

use std::time::Duration;

/// Default time between rebuild opportunities.
pub const DEFAULT_REBUILD_INTERVAL: Duration = Duration::from_millis(100);

/// Decouples the diff arrival rate from the view materialization rate.
///
/// The engine's timer fires every interval; a tick triggers a rebuild only
/// when the dirty flag is set, so an idle book costs nothing and an
/// arbitrarily fast stream costs at most one O(n log n) rebuild per
/// interval. Counters accumulate between rebuilds and survive interval
/// changes.
#[derive(Debug)]
pub struct RebuildScheduler {
    interval: Duration,
    running: bool,
    dirty: bool,
    diffs_applied: u64,
    messages_received: u64,
}

impl RebuildScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            dirty: false,
            diffs_applied: 0,
            messages_received: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Changes the tick interval. The dirty flag and counters are untouched;
    /// only the timer cadence restarts.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether a timer tick should trigger a rebuild; clears the dirty flag
    /// when it does. A clean tick is a no-op.
    pub fn should_rebuild(&mut self) -> bool {
        if !self.running || !self.dirty {
            return false;
        }
        self.dirty = false;
        true
    }

    pub fn record_message(&mut self) {
        self.messages_received += 1;
    }

    pub fn record_diffs(&mut self, applied: u64) {
        self.diffs_applied += applied;
    }

    /// Diffs applied since the last rebuild; resets that counter.
    pub fn take_diffs_applied(&mut self) -> u64 {
        std::mem::take(&mut self.diffs_applied)
    }

    /// Messages received since connect.
    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    /// Clears all session-scoped state on connect or disconnect.
    pub fn reset(&mut self) {
        self.running = false;
        self.dirty = false;
        self.diffs_applied = 0;
        self.messages_received = 0;
    }
}
