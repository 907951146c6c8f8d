//! Wire types for the debugging protocol.
//!
//! These are the fundamental frame shapes. Method vocabulary and parameter
//! schemas are the caller's business; payloads stay as open-ended JSON maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open-ended parameter mapping carried by commands and events.
pub type Params = serde_json::Map<String, Value>;

/// Outbound command. The id is caller-assigned and must be unique among
/// commands still awaiting a reply on the same connection.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub id: u64,
    pub method: String,
    pub params: Params,
}

impl Command {
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            params: Params::new(),
        }
    }

    /// Add a parameter, builder style.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Correlated response to a [`Command`], matched by id. Exactly one of
/// `error`/`result` is populated by a well-behaved remote end.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: u64,
    #[serde(default)]
    pub error: Option<Params>,
    #[serde(default)]
    pub result: Option<Params>,
}

/// Unsolicited notification pushed by the remote end, identified by a
/// dot-namespaced method name such as `"Page.loadEventFired"`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub method: String,
    #[serde(default)]
    pub params: Params,
}

/// Every inbound frame is one of these two shapes. Untagged deserialization
/// tries `Reply` first, so anything carrying an `id` classifies as a reply
/// and a frame with only a `method` classifies as an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Reply(Reply),
    Event(Event),
}

/// Debuggable target descriptor as listed by the `/json` directory endpoint.
/// Chrome omits some fields situationally (`webSocketDebuggerUrl` disappears
/// while another client is attached), hence the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub devtools_frontend_url: String,
    #[serde(default)]
    pub favicon_url: String,
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub tab_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}
