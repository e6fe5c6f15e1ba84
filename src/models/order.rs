//! Raw order records shared by snapshot and diff payloads.

use serde::Deserialize;

use crate::LaminaError;
use crate::book::{Order, Side};

/// A single resting-order record as sent by the feed.
///
/// Prices and sizes arrive as strings; conversion to numbers is an explicit
/// fallible step in [`RawOrder::to_order`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    /// Side code: `"B"` for bids, `"A"` for asks.
    pub side: String,
    pub limit_px: String,
    pub sz: String,
    pub oid: u64,
    /// Placement time in milliseconds since epoch.
    pub timestamp: i64,
    pub user: String,
    #[serde(default)]
    pub is_trigger: bool,
    #[serde(default)]
    pub trigger_condition: Option<String>,
}

impl RawOrder {
    /// Whether this record is a conditional order that has not yet triggered.
    ///
    /// Untriggered conditionals never enter the book; they only become
    /// resting orders once observed with a `"triggered"` condition.
    pub fn is_untriggered(&self) -> bool {
        self.is_trigger
            && !self
                .trigger_condition
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case("triggered"))
    }

    /// Converts the record into a book [`Order`].
    ///
    /// # Errors
    ///
    /// Returns [`LaminaError::MalformedRecord`] when the side code or a
    /// numeric field does not parse.
    pub fn to_order(&self) -> crate::Result<Order> {
        let side = Side::from_wire(&self.side).ok_or_else(|| {
            LaminaError::MalformedRecord(format!(
                "unknown side code {:?} on oid {}",
                self.side, self.oid
            ))
        })?;
        let price = parse_field(&self.limit_px, "limitPx", self.oid)?;
        let size = parse_field(&self.sz, "sz", self.oid)?;

        Ok(Order {
            id: self.oid,
            side,
            price,
            size,
            timestamp: self.timestamp,
            owner: self.user.clone(),
        })
    }
}

/// Lifecycle status attached to each diff entry.
///
/// Statuses outside the open/terminal sets (rejections, trigger
/// notifications) never affected book state and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Open,
    Canceled,
    Filled,
    MarginCanceled,
    ReduceOnlyCanceled,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Whether this status removes the order from the book.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Canceled
                | OrderStatus::Filled
                | OrderStatus::MarginCanceled
                | OrderStatus::ReduceOnlyCanceled
        )
    }
}

fn parse_field(raw: &str, field: &str, oid: u64) -> crate::Result<f64> {
    let value = raw.trim().parse::<f64>().map_err(|_| {
        LaminaError::MalformedRecord(format!("{field} {raw:?} on oid {oid} is not numeric"))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(LaminaError::MalformedRecord(format!(
            "{field} {raw:?} on oid {oid} is out of range"
        )));
    }
    Ok(value)
}
