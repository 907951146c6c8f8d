//! Client for the Chrome DevTools remote debugging protocol.
//!
//! Covers the connection/dispatch layer only: target discovery over the
//! `/json` directory endpoint, one persistent WebSocket per target, and a
//! single reader loop that demultiplexes every inbound frame into either a
//! reply to a pending command or a broadcast event.
//!
//! Design decisions:
//! 1. One WebSocket, one reader loop per connection. Nothing else reads
//!    the socket.
//! 2. Replies correlate to commands by caller-assigned id; events fan out
//!    to subscribers over non-blocking channels.
//! 3. Fail fast. No reconnect, no retry, no request queueing; a dead
//!    connection wakes every waiter with an error instead of hanging.
//!
//! The protocol's method vocabulary is deliberately out of scope: commands
//! carry an opaque method name and JSON parameters, exactly as the wire
//! format does.

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod resolver;

mod correlator;
mod dispatcher;
mod transport;

pub use client::ChromeClient;
pub use error::{Error, Result};
pub use protocol::{Command, Event, Params, Reply, Tab};
pub use registry::Subscription;
pub use resolver::{list_targets, resolve_target};
