//! End-to-end tests for the `/ws` update stream.
//!
//! Each test serves the router on an ephemeral port and talks to it with a
//! real `WebSocket` client, against the in-memory log.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tickrelay_core::{RelayConfig, WAITING_SENTINEL};
use tickrelay_log::{LogBackend, MemoryStreamLog, StreamLog};
use tickrelay_server::build_router;
use tickrelay_server::state::AppState;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve() -> (SocketAddr, Arc<AppState>) {
    let mut config = RelayConfig::default();
    config.poller.block_ms = 0;
    let log = Arc::new(LogBackend::from(MemoryStreamLog::new()));
    let state = Arc::new(AppState::new(log, &config).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(&state));
    drop(tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    }));
    (addr, state)
}

async fn connect(addr: SocketAddr, query: &str) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}/ws{query}")).await.unwrap();
    ws
}

/// Next text frame, skipping keepalives.
async fn next_text(ws: &mut WsStream) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timeout waiting for update")
            .expect("stream closed")
            .expect("ws error");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

#[tokio::test]
async fn first_update_is_sentinel_without_last_mod() {
    let (addr, _state) = serve().await;
    let mut ws = connect(addr, "").await;
    assert_eq!(next_text(&mut ws).await, WAITING_SENTINEL);
}

#[tokio::test]
async fn repeated_last_mod_still_opens_session() {
    let (addr, _state) = serve().await;
    let mut ws = connect(addr, "?lastMod=1&lastMod=2").await;
    assert_eq!(next_text(&mut ws).await, WAITING_SENTINEL);

    let mut ws = connect(addr, "?lastMod=not-hex").await;
    assert_eq!(next_text(&mut ws).await, WAITING_SENTINEL);
}

#[tokio::test]
async fn pending_entries_are_streamed_and_consumed() {
    let (addr, state) = serve().await;
    let id = state
        .poller
        .log()
        .append(vec![(String::from("tick"), String::from("7"))])
        .await
        .unwrap();

    let mut ws = connect(addr, "?lastMod=0").await;
    assert_eq!(next_text(&mut ws).await, format!("{id} => 7\n"));
    assert_eq!(state.poller.log().pending().await.unwrap(), 0);
}

#[tokio::test]
async fn client_close_ends_session() {
    let (addr, state) = serve().await;
    let mut ws = connect(addr, "").await;
    assert_eq!(next_text(&mut ws).await, WAITING_SENTINEL);

    ws.close(None).await.unwrap();
    timeout(TIMEOUT, async {
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    })
    .await
    .expect("session did not end");

    // Nothing consumes the log once the only session is gone.
    state
        .poller
        .log()
        .append(vec![(String::from("tick"), String::from("1"))])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(state.poller.log().pending().await.unwrap(), 1);
}
