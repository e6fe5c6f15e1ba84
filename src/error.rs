//! Crate-level error types.
//!
//! [`LaminaError`] unifies every error source (configuration, WebSocket,
//! JSON, wire records) behind a single enum so callers can match on the
//! variant they care about while still using the `?` operator for easy
//! propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LaminaError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum LaminaError {
    /// A configuration value was missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A wire order record carried a field that does not parse.
    #[error("malformed order record: {0}")]
    MalformedRecord(String),
}
