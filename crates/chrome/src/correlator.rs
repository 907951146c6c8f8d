//! Request/reply correlation by command id.
//!
//! One oneshot channel per outstanding command. The first reply with a
//! matching id wins; a duplicate reply finds no entry and is dropped.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::protocol::Reply;

pub(crate) struct Correlator {
    pending: DashMap<u64, oneshot::Sender<Reply>>,
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Reserve an id and get the receiver its reply will arrive on.
    /// Ids are caller-assigned; reusing one that is still pending is an error.
    pub(crate) fn register(&self, id: u64) -> Result<oneshot::Receiver<Reply>> {
        match self.pending.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateCommandId(id)),
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Forget a pending id (send failure, timeout). No-op if already completed.
    pub(crate) fn discard(&self, id: u64) {
        self.pending.remove(&id);
    }

    /// Route a classified reply to its waiting caller.
    pub(crate) fn complete(&self, reply: Reply) {
        match self.pending.remove(&reply.id) {
            // Send fails only if the caller stopped waiting; nothing to do.
            Some((_, tx)) => {
                let _ = tx.send(reply);
            }
            None => tracing::debug!(id = reply.id, "reply without pending command, dropped"),
        }
    }

    /// Drop every pending entry. Waiting receivers resolve with a closed
    /// channel, which callers surface as `ConnectionClosed`.
    pub(crate) fn abort_all(&self) {
        self.pending.clear();
    }
}
