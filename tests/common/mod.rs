//! In-process backend stand-in for integration tests.
//!
//! Accepts WebSocket connections on an ephemeral port and hands each socket
//! to the test, which scripts requests and replies by hand.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message};
use tokio_tungstenite::{accept_async, WebSocketStream};

pub type ServerSocket = WebSocketStream<TcpStream>;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct MockBackend {
    pub url: String,
    accepted: Arc<AtomicUsize>,
    sockets: mpsc::UnboundedReceiver<ServerSocket>,
}

impl MockBackend {
    pub async fn start() -> Self {
        Self::start_stalling(0).await
    }

    /// Like `start`, but the first `stalled` TCP connections are held open
    /// without ever answering the upgrade.
    pub async fn start_stalling(stalled: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let (tx, sockets) = mpsc::unbounded_channel();

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                if held.len() < stalled {
                    held.push(stream);
                    continue;
                }
                if let Ok(ws) = accept_async(stream).await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if tx.send(ws).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            url: format!("ws://{}/ws", addr),
            accepted,
            sockets,
        }
    }

    /// Next accepted socket.
    pub async fn accept(&mut self) -> ServerSocket {
        tokio::time::timeout(WAIT, self.sockets.recv())
            .await
            .expect("client never connected")
            .expect("accept loop ended")
    }

    /// Sockets accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Next request envelope from the client.
pub async fn read_request(ws: &mut ServerSocket) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("no request within timeout")
            .expect("socket ended")
            .expect("socket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Send a raw text frame.
pub async fn send_text(ws: &mut ServerSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Send a response envelope.
pub async fn reply(ws: &mut ServerSocket, response: Value) {
    send_text(ws, &response.to_string()).await;
}

/// Close with a normal close frame.
pub async fn close(ws: &mut ServerSocket, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_string().into(),
    };
    let _ = ws.close(Some(frame)).await;
}

/// An endpoint nobody listens on.
pub fn dead_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("ws://127.0.0.1:{}/ws", port)
}
