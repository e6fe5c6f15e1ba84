//! Deserialization and classification tests for the feed wire models.

use lamina::models::order::OrderStatus;
use lamina::models::{FeedEvent, SubscribeRequest, classify};

const SNAPSHOT_JSON: &str = include_str!("fixtures/snapshot.json");
const DIFF_JSON: &str = include_str!("fixtures/diff.json");
const ACK_JSON: &str = include_str!("fixtures/ack.json");

#[test]
fn test_subscribe_request_serializes() {
    let request = SubscribeRequest::new("BTC");

    let json = serde_json::to_string(&request).expect("Failed to serialize subscribe request");
    let value: serde_json::Value =
        serde_json::from_str(&json).expect("Failed to parse serialized JSON");

    assert_eq!(value["method"], "subscribe");
    assert_eq!(value["subscription"]["type"], "l4Book");
    assert_eq!(value["subscription"]["coin"], "BTC");
}

#[test]
fn test_snapshot_classifies_and_deserializes() {
    let event = classify(SNAPSHOT_JSON).expect("Failed to classify snapshot");
    let FeedEvent::Snapshot(snapshot) = event else {
        panic!("expected a snapshot event");
    };

    assert_eq!(snapshot.coin, "ETH");
    assert_eq!(snapshot.time, 1715000060000);
    assert_eq!(snapshot.height, 512001);
    assert_eq!(snapshot.levels.0.len(), 3);
    assert_eq!(snapshot.levels.1.len(), 2);

    let bid = &snapshot.levels.0[0];
    assert_eq!(bid.side, "B");
    assert_eq!(bid.limit_px, "3012.5");
    assert_eq!(bid.sz, "4.0");
    assert_eq!(bid.oid, 9001);
    assert_eq!(bid.timestamp, 1714999900000);
    assert_eq!(bid.user, "0xa11ce");
    assert!(!bid.is_trigger);
    assert!(bid.trigger_condition.is_none());

    let trigger_ask = &snapshot.levels.1[1];
    assert!(trigger_ask.is_trigger);
    assert_eq!(trigger_ask.trigger_condition.as_deref(), Some("tp above 3013.5"));
    assert!(trigger_ask.is_untriggered());
}

#[test]
fn test_diff_classifies_and_deserializes() {
    let event = classify(DIFF_JSON).expect("Failed to classify diff");
    let FeedEvent::Diff(diff) = event else {
        panic!("expected a diff event");
    };

    assert_eq!(diff.time, Some(1715000060100));
    assert_eq!(diff.height, Some(512002));
    assert_eq!(diff.order_statuses.len(), 4);

    assert_eq!(diff.order_statuses[0].status, OrderStatus::Open);
    assert_eq!(diff.order_statuses[0].order.oid, 9004);
    assert_eq!(diff.order_statuses[1].status, OrderStatus::Filled);
    assert_eq!(diff.order_statuses[2].status, OrderStatus::MarginCanceled);
    assert_eq!(diff.order_statuses[2].user.as_deref(), Some("0xca41"));
    // Rejection reasons map to the catch-all status and are never applied.
    assert_eq!(diff.order_statuses[3].status, OrderStatus::Other);
}

#[test]
fn test_subscribe_ack_is_ignored() {
    let event = classify(ACK_JSON).expect("Failed to classify ack");
    assert!(matches!(event, FeedEvent::Ignored));
}

#[test]
fn test_book_channel_without_known_shape_is_ignored() {
    let event = classify(r#"{"channel": "l4Book", "data": {"status": "ok"}}"#)
        .expect("Failed to classify");
    assert!(matches!(event, FeedEvent::Ignored));
}

#[test]
fn test_unrelated_channel_is_ignored() {
    let event = classify(r#"{"channel": "trades", "data": [{"px": "1.0"}]}"#)
        .expect("Failed to classify");
    assert!(matches!(event, FeedEvent::Ignored));
}

#[test]
fn test_invalid_json_is_an_error() {
    assert!(classify("{truncated").is_err());
}

#[test]
fn test_book_payload_with_wrong_shape_is_an_error() {
    // Declares itself a snapshot but `levels` is not a two-array pair.
    let result = classify(r#"{"channel": "l4Book", "data": {"levels": 42}}"#);
    assert!(result.is_err());
}
