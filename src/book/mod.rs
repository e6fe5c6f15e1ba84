//! In-memory book state and the views derived from it.
//!
//! [`store`] holds the canonical order set, [`view`] materializes the
//! renderable depth and heatmap buffers, [`regroup`] re-buckets a heatmap
//! for coarser display ticks, and [`locate`] hit-tests a cursor against a
//! view.

pub mod locate;
pub mod regroup;
pub mod store;
pub mod view;

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Parses the feed's single-letter side code.
    pub fn from_wire(code: &str) -> Option<Self> {
        match code {
            "B" => Some(Side::Bid),
            "A" => Some(Side::Ask),
            _ => None,
        }
    }
}

/// A single resting order.
///
/// Immutable once observed; a re-delivered `open` event for the same id
/// replaces the whole order rather than mutating it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: u64,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    /// Placement time in milliseconds since epoch.
    pub timestamp: i64,
    pub owner: String,
}

/// Tolerance below which a bucket aggregate counts as empty.
pub(crate) const SIZE_EPSILON: f64 = 1e-12;

/// Derives the dataset's native tick size from a set of prices.
///
/// The tick is the minimum positive difference between consecutive sorted
/// unique prices, with each difference rounded to 8 decimal places to
/// tolerate floating noise. Falls back to 1.0 when fewer than two distinct
/// prices exist. Callers cache the result per streaming session; diffs
/// cannot introduce a finer granularity than the snapshot already exhibited.
pub fn infer_tick_size<I: IntoIterator<Item = f64>>(prices: I) -> f64 {
    let mut sorted: Vec<f64> = prices.into_iter().collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();

    let mut tick = f64::MAX;
    for pair in sorted.windows(2) {
        let diff = round8(pair[1] - pair[0]);
        if diff > 0.0 && diff < tick {
            tick = diff;
        }
    }

    if tick == f64::MAX { 1.0 } else { tick }
}

fn round8(x: f64) -> f64 {
    (x * 1e8).round() / 1e8
}
