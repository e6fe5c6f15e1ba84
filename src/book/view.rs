//! Single-pass construction of the renderable depth and heatmap views.

use std::time::{Duration, Instant};

use ordered_float::OrderedFloat;
use tracing::trace;

use super::Side;
use super::store::{Bucket, OrderStore};

/// One aggregated price level in the depth view.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthLevel {
    pub price: f64,
    /// Size resting at exactly this price.
    pub size: f64,
    /// Running sum from the best price outward.
    pub cumulative: f64,
}

/// Price-aggregated depth, best price first on both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthView {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// One resting order positioned for heatmap rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOrder {
    pub id: u64,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub timestamp: i64,
    pub owner: String,
    /// Cumulative size of strictly-older orders in the same bucket; bars
    /// stack without overlap.
    pub y_offset: f64,
    /// Global age rank in [0, 1]: oldest 0, newest 1, 0.5 when only one
    /// order is live.
    pub brightness: f64,
}

/// Per-order heatmap rows plus the bounds renderers scale against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapView {
    /// Rows grouped by price column, best price first per side, oldest
    /// first within a column.
    pub orders: Vec<HeatmapOrder>,
    pub tick_size: f64,
    pub price_min: f64,
    pub price_max: f64,
    /// Largest stacked column total across all buckets.
    pub max_cum_size: f64,
}

/// The pair of views handed to the rendering layer per rebuild.
///
/// Crossing the engine boundary by move, never by copy, keeps large order
/// sets from being duplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookView {
    pub depth: DepthView,
    pub heatmap: HeatmapView,
}

/// Builds both views from the store's bucket indexes in one pass.
///
/// The buckets are already price-grouped, so no per-order re-sort is needed
/// beyond the per-bucket timestamp sort and one global rank pass; the cost
/// is O(n log n) in the live order count and must stay off the event
/// handling path. Returns the elapsed build time for observability.
pub fn build(store: &OrderStore, tick_size: f64) -> (BookView, Duration) {
    let started = Instant::now();

    let depth = DepthView {
        bids: aggregate_side(store, Side::Bid),
        asks: aggregate_side(store, Side::Ask),
    };

    let mut rows: Vec<HeatmapOrder> = Vec::with_capacity(store.len());
    let mut max_cum_size = 0.0f64;
    for side in [Side::Bid, Side::Ask] {
        for bucket in best_first(store, side) {
            let mut members: Vec<_> = bucket
                .members
                .iter()
                .filter_map(|id| store.get(*id))
                .collect();
            // Stable sort: equal timestamps keep arrival order.
            members.sort_by_key(|order| order.timestamp);

            let mut y = 0.0;
            for order in members {
                rows.push(HeatmapOrder {
                    id: order.id,
                    side: order.side,
                    price: order.price,
                    size: order.size,
                    timestamp: order.timestamp,
                    owner: order.owner.clone(),
                    y_offset: y,
                    brightness: 0.0,
                });
                y += order.size;
            }
            max_cum_size = max_cum_size.max(y);
        }
    }
    assign_brightness(&mut rows);

    let (price_min, price_max) = price_bounds(store.occupied_prices());

    let view = BookView {
        depth,
        heatmap: HeatmapView {
            orders: rows,
            tick_size,
            price_min,
            price_max,
            max_cum_size,
        },
    };
    let elapsed = started.elapsed();
    trace!(
        orders = store.len(),
        elapsed_us = elapsed.as_micros() as u64,
        "View rebuilt"
    );
    (view, elapsed)
}

fn aggregate_side(store: &OrderStore, side: Side) -> Vec<DepthLevel> {
    let mut cumulative = 0.0;
    let mut levels = Vec::with_capacity(store.level_count(side));
    let buckets = store.side(side);
    let iter: Box<dyn Iterator<Item = (&OrderedFloat<f64>, &Bucket)> + '_> = match side {
        Side::Bid => Box::new(buckets.iter().rev()),
        Side::Ask => Box::new(buckets.iter()),
    };
    for (price, bucket) in iter {
        cumulative += bucket.total_size;
        levels.push(DepthLevel {
            price: price.into_inner(),
            size: bucket.total_size,
            cumulative,
        });
    }
    levels
}

fn best_first<'a>(store: &'a OrderStore, side: Side) -> Box<dyn Iterator<Item = &'a Bucket> + 'a> {
    let buckets = store.side(side);
    match side {
        Side::Bid => Box::new(buckets.values().rev()),
        Side::Ask => Box::new(buckets.values()),
    }
}

/// One global pass assigning each row its timestamp rank in [0, 1].
fn assign_brightness(rows: &mut [HeatmapOrder]) {
    let n = rows.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        rows[0].brightness = 0.5;
        return;
    }
    let mut by_age: Vec<usize> = (0..n).collect();
    by_age.sort_by_key(|&i| rows[i].timestamp);
    let span = (n - 1) as f64;
    for (rank, &i) in by_age.iter().enumerate() {
        rows[i].brightness = rank as f64 / span;
    }
}

pub(crate) fn price_bounds<I: Iterator<Item = f64>>(prices: I) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut occupied = false;
    for price in prices {
        occupied = true;
        min = min.min(price);
        max = max.max(price);
    }
    if occupied { (min, max) } else { (0.0, 0.0) }
}
