//! Error types for the connection/dispatch layer.
//!
//! One flat enum for the whole crate. No over-engineering.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("target {index} not found ({available} targets listed)")]
    TargetNotFound { index: usize, available: usize },

    #[error("directory fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid directory URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("no reply to {method} within the deadline")]
    Timeout { method: String },

    #[error("command id {0} already has a reply pending")]
    DuplicateCommandId(u64),
}
