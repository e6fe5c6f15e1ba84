//! Wire models for the L4 book feed.
//!
//! Contains the subscribe request, the channel envelope wrapping every
//! incoming message, and the classification of payloads into snapshot or
//! diff events.

pub mod diff;
pub mod order;
pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::models::diff::WireDiff;
use crate::models::snapshot::WireSnapshot;

/// Wire name of the per-order book channel.
pub const L4_BOOK_CHANNEL: &str = "l4Book";

/// A `subscribe` request sent to the feed.
#[derive(Serialize)]
pub struct SubscribeRequest {
    pub method: String,
    pub subscription: Subscription,
}

/// Channel and coin parameters used in subscribe requests.
#[derive(Serialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub channel: String,
    pub coin: String,
}

impl SubscribeRequest {
    /// Builds the subscribe request for `coin`'s per-order book.
    pub fn new(coin: &str) -> Self {
        Self {
            method: "subscribe".to_string(),
            subscription: Subscription {
                channel: L4_BOOK_CHANNEL.to_string(),
                coin: coin.to_string(),
            },
        }
    }
}

/// Envelope wrapping every incoming feed message.
#[derive(Debug, Deserialize)]
pub struct WsEnvelope {
    pub channel: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Classification of one incoming transport message.
#[derive(Debug)]
pub enum FeedEvent {
    /// Full order set; resets the book.
    Snapshot(WireSnapshot),
    /// Incremental batch of `(status, order)` pairs.
    Diff(WireDiff),
    /// Subscribe acks, heartbeats, and unrelated channels.
    Ignored,
}

/// Classifies a raw text frame into a [`FeedEvent`].
///
/// Book payloads are distinguished by shape: a `levels` field marks a
/// snapshot, an `order_statuses` field marks a diff batch. Anything else on
/// the book channel, and every other channel, is ignored.
///
/// # Errors
///
/// Returns [`LaminaError::Json`](crate::LaminaError::Json) when the frame is
/// not valid JSON or a book payload does not match its declared shape.
pub fn classify(text: &str) -> crate::Result<FeedEvent> {
    let envelope: WsEnvelope = serde_json::from_str(text)?;
    if envelope.channel != L4_BOOK_CHANNEL {
        return Ok(FeedEvent::Ignored);
    }

    if envelope.data.get("levels").is_some() {
        Ok(FeedEvent::Snapshot(serde_json::from_value(envelope.data)?))
    } else if envelope.data.get("order_statuses").is_some() {
        Ok(FeedEvent::Diff(serde_json::from_value(envelope.data)?))
    } else {
        Ok(FeedEvent::Ignored)
    }
}
