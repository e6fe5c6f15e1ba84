//! Incremental book update payload.

use serde::Deserialize;

use crate::models::order::{OrderStatus, RawOrder};

/// A batch of order status changes relative to the last snapshot or diff.
#[derive(Debug, Clone, Deserialize)]
pub struct WireDiff {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub height: Option<u64>,
    pub order_statuses: Vec<OrderStatusEntry>,
}

/// One `(status, order)` pair inside a diff batch.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusEntry {
    pub status: OrderStatus,
    pub order: RawOrder,
    #[serde(default)]
    pub user: Option<String>,
}
