//! Full book snapshot payload.

use serde::Deserialize;

use crate::models::order::RawOrder;

/// A complete, self-consistent order set at a point in time.
///
/// `levels` is a two-element array: bids first, asks second. The same shape
/// arrives over the transport after every (re)subscribe and from a static
/// file on the offline load path.
#[derive(Debug, Clone, Deserialize)]
pub struct WireSnapshot {
    pub coin: String,
    /// Feed time in milliseconds since epoch.
    pub time: i64,
    /// Chain height the snapshot was taken at.
    pub height: u64,
    /// `(bids, asks)` raw order records.
    pub levels: (Vec<RawOrder>, Vec<RawOrder>),
}

impl WireSnapshot {
    /// Iterates both sides' raw records, bids first.
    pub fn records(&self) -> impl Iterator<Item = &RawOrder> {
        self.levels.0.iter().chain(self.levels.1.iter())
    }
}
