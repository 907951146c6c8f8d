//! End-to-end tests against a scripted in-process WebSocket peer.
//!
//! Each test spins up a real listener, hands the accepted socket to a
//! script playing the remote end, and drives a `ChromeClient` against it.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use chrome_remote::{ChromeClient, Command, Error};

type ServerWs = WebSocketStream<TcpStream>;

const TICK: Duration = Duration::from_secs(2);

/// Bind an ephemeral port, run `script` as the remote end on the first
/// accepted connection, and return the ws URL to dial.
async fn scripted_peer<F, Fut>(script: F) -> String
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        script(ws).await;
    });
    format!("ws://{addr}")
}

async fn recv_command(ws: &mut ServerWs) -> Value {
    loop {
        match ws.next().await.expect("peer: stream ended").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Remote end that answers every command with `{id, result: {echo: method}}`.
async fn echoing_peer(mut ws: ServerWs) {
    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Text(text) = msg {
            let cmd: Value = serde_json::from_str(&text).unwrap();
            let reply = json!({"id": cmd["id"], "result": {"echo": cmd["method"]}});
            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    }
}

#[tokio::test]
async fn send_sync_reply_carries_the_command_id() {
    let url = scripted_peer(echoing_peer).await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let reply = client
        .send_sync(Command::new(42, "Browser.getVersion"), TICK)
        .await
        .unwrap();

    assert_eq!(reply.id, 42);
    assert_eq!(reply.result.unwrap()["echo"], "Browser.getVersion");
    client.close().await.unwrap();
}

#[tokio::test]
async fn out_of_order_replies_resolve_by_id() {
    let url = scripted_peer(|mut ws| async move {
        let first = recv_command(&mut ws).await;
        let second = recv_command(&mut ws).await;
        // Answer in reverse arrival order.
        send_json(&mut ws, json!({"id": second["id"], "result": {"tag": "second"}})).await;
        send_json(&mut ws, json!({"id": first["id"], "result": {"tag": "first"}})).await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let (a, b) = tokio::join!(
        client.send_sync(Command::new(1, "First.call"), TICK),
        client.send_sync(Command::new(2, "Second.call"), TICK),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.id, 1);
    assert_eq!(a.result.unwrap()["tag"], "first");
    assert_eq!(b.id, 2);
    assert_eq!(b.result.unwrap()["tag"], "second");
    client.close().await.unwrap();
}

#[tokio::test]
async fn subscriber_sees_its_method_and_nothing_else() {
    let url = scripted_peer(|mut ws| async move {
        // Wait for the go-ahead so the subscription exists before we emit.
        recv_command(&mut ws).await;
        send_json(&mut ws, json!({"method": "Page.loadEventFired", "params": {}})).await;
        send_json(
            &mut ws,
            json!({"method": "Network.requestWillBeSent", "params": {"requestId": "r1"}}),
        )
        .await;
        send_json(
            &mut ws,
            json!({"method": "Network.requestWillBeSent", "params": {"requestId": "r2"}}),
        )
        .await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();
    let mut requests = client.on("Network.requestWillBeSent");

    client.send(Command::new(1, "go")).await.unwrap();

    let first = requests.next().await.unwrap();
    assert_eq!(first.method, "Network.requestWillBeSent");
    assert_eq!(first.params["requestId"], "r1");
    let second = requests.next().await.unwrap();
    assert_eq!(second.params["requestId"], "r2");

    // The Page event was emitted first; had it leaked through it would have
    // arrived before r1. After close the stream ends cleanly.
    client.close().await.unwrap();
    assert!(requests.next().await.is_none());
}

#[tokio::test]
async fn domain_subscription_sees_every_network_event() {
    let url = scripted_peer(|mut ws| async move {
        recv_command(&mut ws).await;
        send_json(&mut ws, json!({"method": "Network.requestWillBeSent", "params": {}})).await;
        send_json(&mut ws, json!({"method": "Page.loadEventFired", "params": {}})).await;
        send_json(&mut ws, json!({"method": "Network.loadingFinished", "params": {}})).await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();
    let mut network = client.on_domain("Network");

    client.send(Command::new(1, "go")).await.unwrap();

    assert_eq!(network.next().await.unwrap().method, "Network.requestWillBeSent");
    assert_eq!(network.next().await.unwrap().method, "Network.loadingFinished");
    client.close().await.unwrap();
}

#[tokio::test]
async fn off_stops_delivery_and_is_idempotent() {
    let url = scripted_peer(|mut ws| async move {
        recv_command(&mut ws).await;
        send_json(&mut ws, json!({"method": "Network.requestWillBeSent", "params": {}})).await;
        send_json(&mut ws, json!({"method": "Page.loadEventFired", "params": {}})).await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let mut removed = client.on("Network.requestWillBeSent");
    let mut marker = client.on("Page.loadEventFired");
    client.off(&removed);
    client.off(&removed); // double removal is a no-op

    client.send(Command::new(1, "go")).await.unwrap();

    // The marker event is emitted after the removed subscription's method,
    // so once it arrives the broadcast for the removed sink already happened.
    assert!(marker.next().await.is_some());
    assert!(removed.next().await.is_none());
    client.close().await.unwrap();
}

#[tokio::test]
async fn malformed_frame_does_not_stop_the_reader() {
    let url = scripted_peer(|mut ws| async move {
        let cmd = recv_command(&mut ws).await;
        ws.send(Message::Text("][ this is not json".into())).await.unwrap();
        // A frame that is valid JSON but neither reply nor event.
        send_json(&mut ws, json!({"hello": "world"})).await;
        send_json(&mut ws, json!({"id": cmd["id"], "result": {}})).await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let reply = client
        .send_sync(Command::new(7, "Page.enable"), TICK)
        .await
        .unwrap();

    assert_eq!(reply.id, 7);
    client.close().await.unwrap();
}

#[tokio::test]
async fn send_after_close_fails_instead_of_hanging() {
    let url = scripted_peer(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    client.close().await.unwrap();
    client.close().await.unwrap(); // idempotent

    assert!(client.is_closed());
    assert!(matches!(
        client.send(Command::new(1, "Page.enable")).await,
        Err(Error::ConnectionClosed)
    ));
    assert!(matches!(
        client.send_sync(Command::new(2, "Page.enable"), TICK).await,
        Err(Error::ConnectionClosed)
    ));
}

#[tokio::test]
async fn send_sync_times_out_when_no_reply_comes() {
    let url = scripted_peer(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let outcome = client
        .send_sync(Command::new(3, "Page.navigate"), Duration::from_millis(100))
        .await;
    assert!(matches!(outcome, Err(Error::Timeout { ref method }) if method == "Page.navigate"));

    // The timed-out id was withdrawn and may be reused.
    let outcome = client
        .send_sync(Command::new(3, "Page.navigate"), Duration::from_millis(100))
        .await;
    assert!(matches!(outcome, Err(Error::Timeout { .. })));
    client.close().await.unwrap();
}

#[tokio::test]
async fn duplicate_in_flight_id_is_rejected() {
    let url = scripted_peer(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;
    let client = std::sync::Arc::new(ChromeClient::connect(&url).await.unwrap());

    let pending = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .send_sync(Command::new(9, "Slow.call"), Duration::from_millis(400))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        client.send_sync(Command::new(9, "Slow.call"), TICK).await,
        Err(Error::DuplicateCommandId(9))
    ));
    assert!(matches!(pending.await.unwrap(), Err(Error::Timeout { .. })));
    client.close().await.unwrap();
}

#[tokio::test]
async fn remote_close_wakes_pending_callers() {
    let url = scripted_peer(|mut ws| async move {
        recv_command(&mut ws).await;
        ws.close(None).await.unwrap();
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    let outcome = client.send_sync(Command::new(1, "Page.enable"), TICK).await;
    assert!(matches!(outcome, Err(Error::ConnectionClosed)));
    assert!(client.is_closed());
}

#[tokio::test]
async fn wait_for_event_returns_the_first_match() {
    let url = scripted_peer(|mut ws| async move {
        recv_command(&mut ws).await;
        send_json(&mut ws, json!({"method": "Network.loadingFinished", "params": {}})).await;
        send_json(
            &mut ws,
            json!({"method": "Page.loadEventFired", "params": {"timestamp": 12.0}}),
        )
        .await;
    })
    .await;
    let client = ChromeClient::connect(&url).await.unwrap();

    client.send(Command::new(1, "go")).await.unwrap();
    let loaded = client.wait_for_event("Page.loadEventFired", TICK).await.unwrap();

    assert_eq!(loaded.method, "Page.loadEventFired");
    assert_eq!(loaded.params["timestamp"], 12.0);
    client.close().await.unwrap();
}
