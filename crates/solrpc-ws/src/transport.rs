//! Socket abstraction under the subscription channel.
//!
//! A [`SocketConnector`] opens one [`TransportSocket`] per connection attempt.
//! The default connector uses `tokio-tungstenite`; tests plug in scripted
//! sockets through the same traits.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use solrpc_core::error::TransportError;

/// Something that happened on an open socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// A text payload, forwarded to the handler verbatim.
    Message(String),
    /// A liveness answer (pong or server ping). Never forwarded.
    Pong,
    /// The peer closed the connection or the stream ended.
    Closed(Option<String>),
    /// A read failure.
    Error(TransportError),
}

/// One live connection.
///
/// `next_event` must be cancel-safe: the channel races it against the
/// keepalive timer and drops the future when the timer wins.
#[async_trait]
pub trait TransportSocket: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a liveness probe.
    async fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Wait for the next event.
    async fn next_event(&mut self) -> SocketEvent;

    /// Best-effort close.
    async fn close(&mut self);
}

/// Opens sockets to an endpoint.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportSocket>, TransportError>;
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl SocketConnector for TungsteniteConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportSocket>, TransportError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;
        Ok(Box::new(TungsteniteSocket { inner: ws_stream }))
    }
}

/// A `tokio-tungstenite` WebSocket stream.
pub struct TungsteniteSocket {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportSocket for TungsteniteSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), TransportError> {
        self.inner
            .send(Message::Ping(Vec::<u8>::new().into()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn next_event(&mut self) -> SocketEvent {
        loop {
            match self.inner.next().await {
                None => return SocketEvent::Closed(None),
                Some(Err(e)) => return SocketEvent::Error(TransportError::WebSocket(e.to_string())),
                Some(Ok(Message::Text(text))) => return SocketEvent::Message(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return SocketEvent::Message(text),
                    Err(_) => tracing::debug!("dropping non-UTF-8 binary frame"),
                },
                // tungstenite queues the pong reply and flushes it on the next read.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => return SocketEvent::Pong,
                Some(Ok(Message::Close(frame))) => {
                    return SocketEvent::Closed(frame.map(|f| format!("{} {}", f.code, f.reason)))
                }
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            tracing::debug!(error = %e, "WS close failed");
        }
    }
}
