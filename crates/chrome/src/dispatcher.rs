//! The reader loop. Exactly one runs per connection.
//!
//! Every inbound frame is classified as a reply (routed to the correlator)
//! or an event (broadcast through the registry). Per-frame decode failures
//! are transient: logged and skipped. Transport-level failures are fatal:
//! the loop stops, the connection is marked closed, and every waiter is
//! woken so nothing blocks on a dead socket.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::correlator::Correlator;
use crate::protocol::InboundFrame;
use crate::registry::Registry;
use crate::transport::{Transport, WsStream};

pub(crate) fn spawn(
    mut stream: WsStream,
    transport: Arc<Transport>,
    correlator: Arc<Correlator>,
    registry: Arc<Registry>,
    mut shutdown: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_frame(&text, &correlator, &registry);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("remote end closed the connection");
                        break;
                    }
                    // Pings are answered by the library; binary frames are
                    // not part of this protocol.
                    Some(Ok(other)) => {
                        tracing::trace!(?other, "ignoring non-text frame");
                    }
                    Some(Err(e)) => {
                        tracing::error!("fatal read error: {e}");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::debug!("reader loop stopping on close");
                    break;
                }
            }
        }

        transport.mark_closed();
        correlator.abort_all();
        registry.clear();
    })
}

fn dispatch_frame(text: &str, correlator: &Correlator, registry: &Registry) {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::Reply(reply)) => correlator.complete(reply),
        Ok(InboundFrame::Event(event)) => {
            tracing::trace!(method = %event.method, "event");
            registry.broadcast(event);
        }
        Err(e) => tracing::warn!("malformed frame dropped: {e}"),
    }
}
