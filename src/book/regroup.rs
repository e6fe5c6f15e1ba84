//! Re-buckets a heatmap view into wider price columns for coarser display
//! zoom levels.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use super::Side;
use super::view::{HeatmapOrder, HeatmapView, price_bounds};

/// Tolerance against float-boundary misclassification when snapping.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Snaps every order in `view` onto multiples of `target_tick`.
///
/// Bids floor to the multiple at or below their price, asks ceil to the
/// multiple at or above, so a bid bucket and an ask bucket can never land on
/// the same price. Row count and per-row brightness are preserved; only
/// bucket membership, stacking offsets, and bounds change. Returns a clone
/// when `target_tick` is not coarser than the view's own tick.
pub fn regroup(view: &HeatmapView, target_tick: f64) -> HeatmapView {
    if target_tick <= view.tick_size {
        return view.clone();
    }

    let mut bids: BTreeMap<OrderedFloat<f64>, Vec<HeatmapOrder>> = BTreeMap::new();
    let mut asks: BTreeMap<OrderedFloat<f64>, Vec<HeatmapOrder>> = BTreeMap::new();
    for row in &view.orders {
        let mut row = row.clone();
        row.price = snap(row.price, row.side, target_tick);
        let side_groups = match row.side {
            Side::Bid => &mut bids,
            Side::Ask => &mut asks,
        };
        side_groups
            .entry(OrderedFloat(row.price))
            .or_default()
            .push(row);
    }

    let mut orders = Vec::with_capacity(view.orders.len());
    let mut max_cum_size = 0.0f64;
    for group in bids.values_mut().rev().chain(asks.values_mut()) {
        // Stable sort: merged buckets keep arrival order on timestamp ties.
        group.sort_by_key(|row| row.timestamp);
        let mut y = 0.0;
        for mut row in group.drain(..) {
            row.y_offset = y;
            y += row.size;
            orders.push(row);
        }
        max_cum_size = max_cum_size.max(y);
    }

    let (price_min, price_max) =
        price_bounds(bids.keys().chain(asks.keys()).map(|k| k.into_inner()));

    HeatmapView {
        orders,
        tick_size: target_tick,
        price_min,
        price_max,
        max_cum_size,
    }
}

fn snap(price: f64, side: Side, tick: f64) -> f64 {
    let ratio = price / tick;
    let units = match side {
        Side::Bid => (ratio + BOUNDARY_EPSILON).floor(),
        Side::Ask => (ratio - BOUNDARY_EPSILON).ceil(),
    };
    units * tick
}
