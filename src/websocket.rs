//! Async WebSocket transport for the L4 book feed.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::SubscribeRequest;

/// Write half of a feed connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a feed connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`LaminaError`](crate::LaminaError) if the connection or TLS
/// handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Sends the per-order book subscribe request for `coin`.
///
/// The adapter is optimistic: the session counts as subscribed as soon as
/// the request is on the wire, without waiting for a server ack. The feed
/// redelivers a full snapshot after every fresh subscribe.
///
/// # Errors
///
/// Returns a [`LaminaError`](crate::LaminaError) if sending the subscription
/// message fails.
pub async fn subscribe(write: &mut WsWriter, coin: &str) -> Result<()> {
    let request = SubscribeRequest::new(coin);
    let json = serde_json::to_string(&request)?;
    debug!("Sending subscribe request: {json}");
    write.send(Message::Text(json.into())).await?;
    info!(coin, "Subscribed to order feed");

    Ok(())
}
