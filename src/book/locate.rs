//! Cursor hit-testing against a heatmap view.

use super::view::{HeatmapOrder, HeatmapView};

/// The currently visible window, owned by the rendering layer and read-only
/// to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRange {
    pub price_min: f64,
    pub price_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// A matched order plus its price-level aggregate, for tooltip display.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorHit {
    pub order: HeatmapOrder,
    /// Total size resting at the matched price level.
    pub level_total: f64,
}

/// Finds the order under a normalized cursor position.
///
/// `cursor_x` and `cursor_y` are in [0, 1] relative to `range`. Phase one
/// scans for the nearest price column and reports no match when the nearest
/// distance exceeds half the view's tick (the cursor is between columns).
/// Phase two picks, among orders at that exact price, the stacked span
/// `[y_offset, y_offset + size]` containing the cursor's y, falling back to
/// the span with the nearest edge.
///
/// A linear scan, bounded by the live order count; invoked on pointer
/// movement only, never on the streaming path.
pub fn locate(
    view: &HeatmapView,
    range: &ViewRange,
    cursor_x: f64,
    cursor_y: f64,
) -> Option<CursorHit> {
    if view.orders.is_empty() {
        return None;
    }

    let price = range.price_min + cursor_x * (range.price_max - range.price_min);
    let y = range.y_min + cursor_y * (range.y_max - range.y_min);

    let mut nearest_price = view.orders[0].price;
    let mut nearest_dist = f64::MAX;
    for row in &view.orders {
        let dist = (row.price - price).abs();
        if dist < nearest_dist {
            nearest_dist = dist;
            nearest_price = row.price;
        }
    }
    if nearest_dist > view.tick_size / 2.0 {
        return None;
    }

    let mut level_total = 0.0;
    let mut best: Option<(&HeatmapOrder, f64)> = None;
    for row in view.orders.iter().filter(|r| r.price == nearest_price) {
        level_total += row.size;
        let lo = row.y_offset;
        let hi = row.y_offset + row.size;
        let dist = if (lo..=hi).contains(&y) {
            0.0
        } else {
            (y - lo).abs().min((y - hi).abs())
        };
        if best.as_ref().is_none_or(|(_, d)| dist < *d) {
            best = Some((row, dist));
        }
    }

    best.map(|(row, _)| CursorHit {
        order: row.clone(),
        level_total,
    })
}
