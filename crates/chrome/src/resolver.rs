//! Target discovery against the HTTP directory endpoint.
//!
//! A browser started with `--remote-debugging-port` serves its debuggable
//! targets as a JSON array at `{base}/json`. Resolution is a single fetch,
//! no caching, no retry.

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Tab;

/// Fetch the full directory listing.
pub async fn list_targets(base_url: &str) -> Result<Vec<Tab>> {
    let endpoint = Url::parse(base_url)?.join("/json")?;
    let body = reqwest::get(endpoint)
        .await?
        .error_for_status()?
        .text()
        .await?;
    let tabs: Vec<Tab> = serde_json::from_str(&body)?;
    tracing::debug!(count = tabs.len(), "fetched target directory");
    Ok(tabs)
}

/// Resolve the `index`-th target's connection endpoint.
///
/// The bound check is `index >= len`: an index equal to the listing length
/// is out of range. A listed target without a `webSocketDebuggerUrl`
/// (another client already attached) is treated as not found as well.
pub async fn resolve_target(base_url: &str, index: usize) -> Result<String> {
    let tabs = list_targets(base_url).await?;
    let not_found = Error::TargetNotFound {
        index,
        available: tabs.len(),
    };
    match tabs.get(index) {
        Some(tab) => tab.web_socket_debugger_url.clone().ok_or(not_found),
        None => Err(not_found),
    }
}
