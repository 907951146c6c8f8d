//! WebSocket transport. Owns the single persistent connection.
//!
//! The socket splits once at connect time: the write half lives here behind
//! a lock, the read half goes to the dispatcher. Nothing else touches the
//! socket directly.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::CONTENT_TYPE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};

pub(crate) type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub(crate) type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub(crate) struct Transport {
    sink: Mutex<WsSink>,
    closed: AtomicBool,
}

impl Transport {
    /// Perform the upgrade handshake and split the socket. The handshake
    /// request carries `Content-Type: application/json`, matching what the
    /// DevTools endpoint expects.
    pub(crate) async fn connect(ws_url: &str) -> Result<(Self, WsStream)> {
        let mut request = ws_url.into_client_request()?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let (ws, _) = connect_async(request).await?;
        let (sink, stream) = ws.split();
        tracing::info!(url = ws_url, "connected");

        let transport = Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        };
        Ok((transport, stream))
    }

    /// Write one discrete text frame. Fails fast once the connection is
    /// closed instead of queueing on a dead socket.
    pub(crate) async fn send_text(&self, payload: String) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(payload)).await?;
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection closed without touching the socket. Used by the
    /// dispatcher when the read side fails.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Close the connection. Idempotent: only the first call performs the
    /// close handshake; later calls are no-ops.
    pub(crate) async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            // The peer may already be gone; the connection is closed either way.
            tracing::debug!("close handshake: {e}");
        }
        Ok(())
    }
}
