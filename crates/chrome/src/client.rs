//! The client facade callers hold.
//!
//! Composes transport, correlator, registry and the reader loop behind one
//! object. All methods take `&self` and are safe to call concurrently with
//! each other and with the reader loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::correlator::Correlator;
use crate::dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{Command, Event, Reply};
use crate::registry::{Registry, Subscription};
use crate::resolver;
use crate::transport::Transport;

/// Connection to a single debuggable target.
///
/// ```no_run
/// use std::time::Duration;
/// use chrome_remote::{ChromeClient, Command};
///
/// # async fn run() -> chrome_remote::Result<()> {
/// let client = ChromeClient::dial("http://localhost:9222", 0).await?;
/// client.send(Command::new(1, "Network.enable")).await?;
///
/// let mut requests = client.on_domain("Network");
/// let reply = client
///     .send_sync(
///         Command::new(2, "Page.navigate").param("url", "https://example.com"),
///         Duration::from_secs(5),
///     )
///     .await?;
/// assert_eq!(reply.id, 2);
///
/// while let Some(event) = requests.next().await {
///     println!("{}", event.method);
/// }
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ChromeClient {
    transport: Arc<Transport>,
    correlator: Arc<Correlator>,
    registry: Arc<Registry>,
    shutdown: mpsc::Sender<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ChromeClient {
    /// Resolve the `target_index`-th entry of the `{base_url}/json`
    /// directory and connect to it.
    pub async fn dial(base_url: &str, target_index: usize) -> Result<Self> {
        let ws_url = resolver::resolve_target(base_url, target_index).await?;
        Self::connect(&ws_url).await
    }

    /// Connect straight to a known `webSocketDebuggerUrl`, skipping
    /// directory resolution. Starts the reader loop.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (transport, stream) = Transport::connect(ws_url).await?;
        let transport = Arc::new(transport);
        let correlator = Arc::new(Correlator::new());
        let registry = Arc::new(Registry::new());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let reader = dispatcher::spawn(
            stream,
            Arc::clone(&transport),
            Arc::clone(&correlator),
            Arc::clone(&registry),
            shutdown_rx,
        );

        Ok(Self {
            transport,
            correlator,
            registry,
            shutdown: shutdown_tx,
            reader: Mutex::new(Some(reader)),
        })
    }

    /// Fire-and-forget dispatch. Returns once the frame is written; any
    /// reply the remote end produces goes unobserved unless a correlation
    /// was registered via [`send_sync`](Self::send_sync).
    pub async fn send(&self, command: Command) -> Result<()> {
        let payload = serde_json::to_string(&command)?;
        self.transport.send_text(payload).await
    }

    /// Send a command and wait for the reply carrying the same id.
    ///
    /// The command id must not already be awaiting a reply. If no reply
    /// arrives within `timeout` the pending entry is withdrawn and
    /// [`Error::Timeout`] is returned; a connection that dies while waiting
    /// surfaces as [`Error::ConnectionClosed`].
    pub async fn send_sync(&self, command: Command, timeout: Duration) -> Result<Reply> {
        if self.transport.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        let id = command.id;
        let method = command.method.clone();
        let rx = self.correlator.register(id)?;

        if let Err(e) = self.send(command).await {
            self.correlator.discard(id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.correlator.discard(id);
                Err(Error::Timeout { method })
            }
        }
    }

    /// Subscribe to events with this exact method name.
    pub fn on(&self, method: impl Into<String>) -> Subscription {
        self.registry.subscribe(method.into())
    }

    /// Subscribe to every event of a domain, e.g. `"Network"` for all
    /// `Network.*` notifications.
    pub fn on_domain(&self, domain: impl Into<String>) -> Subscription {
        let mut prefix = domain.into();
        if !prefix.ends_with('.') {
            prefix.push('.');
        }
        self.registry.subscribe_prefix(prefix)
    }

    /// Remove a subscription. Removing one twice is a no-op.
    pub fn off(&self, subscription: &Subscription) {
        self.registry.unsubscribe(subscription);
    }

    /// Wait for the next event with this exact method name. Convenience
    /// one-shot subscription, typically used for `"Page.loadEventFired"`.
    pub async fn wait_for_event(&self, method: impl Into<String>, timeout: Duration) -> Result<Event> {
        let method = method.into();
        let mut sub = self.registry.subscribe(method.clone());
        let outcome = match tokio::time::timeout(timeout, sub.next()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::Timeout { method }),
        };
        self.registry.unsubscribe(&sub);
        outcome
    }

    /// Close the connection. Stops the reader loop, wakes every pending
    /// `send_sync`, ends every subscription, and releases the socket.
    /// Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        // try_send: a second close finds the loop already stopping (or
        // stopped, with the receiver gone) and both are fine.
        let _ = self.shutdown.try_send(());
        self.transport.close().await?;
        if let Some(reader) = self.reader.lock().await.take() {
            let _ = reader.await;
        }
        Ok(())
    }

    /// Whether the connection has been closed, by either side.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}
