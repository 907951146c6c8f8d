//! Watch network traffic on the first debuggable tab.
//!
//! Start Chrome with `--remote-debugging-port=9222` and open a page first.

use std::time::Duration;

use chrome_remote::{ChromeClient, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = ChromeClient::dial("http://localhost:9222", 0).await?;
    println!("connected");

    let mut network = client.on_domain("Network");

    client.send(Command::new(1, "Network.enable")).await?;
    client
        .send_sync(
            Command::new(2, "Page.enable"),
            Duration::from_secs(5),
        )
        .await?;
    client
        .send_sync(
            Command::new(3, "Page.navigate").param("url", "https://example.com"),
            Duration::from_secs(5),
        )
        .await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = network.next().await {
            println!("{}", event.method);
        }
    });

    let loaded = client
        .wait_for_event("Page.loadEventFired", Duration::from_secs(30))
        .await?;
    println!("page loaded: {:?}", loaded.params.get("timestamp"));

    client.close().await?;
    printer.await?;
    Ok(())
}
