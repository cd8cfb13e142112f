//! WebSocket Transport Layer
//!
//! Single responsibility: Open a WebSocket to the backend and hand back its halves.
//! No knowledge of JSON-RPC, correlation ids, or connection state.

use futures_util::{
    stream::{SplitSink, SplitStream},
    StreamExt,
};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{
        http::Request,
        protocol::{frame::coding::CloseCode, CloseFrame, Message},
        Error as WsError,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::error::{CloseReason, VaultError};

/// Type alias for the WebSocket send half
pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;

/// Type alias for the WebSocket receive half
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// A freshly opened WebSocket.
///
/// Can only be constructed via `Transport::connect()`, so holding one means
/// the handshake completed.
pub struct Transport {
    sink: WsSink,
    stream: WsStream,
}

impl Transport {
    /// Open a WebSocket to `url`.
    ///
    /// A handshake that ends in a close is reported as `VaultError::Closed`,
    /// anything else as `VaultError::Connect`.
    pub async fn connect(url: &str) -> Result<Self, VaultError> {
        debug!(url = %url, "Opening WebSocket");

        if url.starts_with("wss:") {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        let request = Request::builder()
            .uri(url)
            .header("Host", extract_host(url))
            .header("Origin", origin_for(url))
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Sec-WebSocket-Version", "13")
            .header(
                "Sec-WebSocket-Key",
                tokio_tungstenite::tungstenite::handshake::client::generate_key(),
            )
            .body(())
            .map_err(|e| VaultError::Connect(format!("Failed to build request: {}", e)))?;

        let (ws, _) = connect_async_with_config(request, None, false)
            .await
            .map_err(map_ws_error)?;

        let (sink, stream) = ws.split();

        debug!(url = %url, "WebSocket open");
        Ok(Self { sink, stream })
    }

    /// Split into separate sink and stream for concurrent send/receive.
    pub fn split(self) -> (WsSink, WsStream) {
        (self.sink, self.stream)
    }
}

/// Map a tungstenite error onto the transport failure taxonomy.
pub fn map_ws_error(err: WsError) -> VaultError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            VaultError::Closed(CloseReason::default())
        }
        other => VaultError::Connect(other.to_string()),
    }
}

/// Convert a received close frame into a `CloseReason`.
pub fn close_reason(frame: Option<CloseFrame<'_>>) -> CloseReason {
    match frame {
        Some(frame) => CloseReason {
            code: Some(u16::from(frame.code)),
            reason: frame.reason.into_owned(),
        },
        None => CloseReason::default(),
    }
}

/// Whether a close code signals an orderly shutdown.
pub fn is_normal_close(code: Option<u16>) -> bool {
    matches!(code.map(CloseCode::from), Some(CloseCode::Normal) | Some(CloseCode::Away))
}

/// Extract host from URL for Host header
fn extract_host(url: &str) -> &str {
    url.split("//")
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("localhost")
}

/// Page origin the backend expects, derived back from the socket URL.
fn origin_for(url: &str) -> String {
    let scheme = if url.starts_with("wss:") { "https" } else { "http" };
    format!("{}://{}", scheme, extract_host(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("ws://127.0.0.1:8888/ws"), "127.0.0.1:8888");
        assert_eq!(extract_host("wss://example.com/ws"), "example.com");
        assert_eq!(extract_host("invalid"), "localhost");
    }

    #[test]
    fn test_origin_for() {
        assert_eq!(origin_for("ws://127.0.0.1:8888/ws"), "http://127.0.0.1:8888");
        assert_eq!(origin_for("wss://vault.example.com/ws"), "https://vault.example.com");
    }

    #[test]
    fn test_close_reason_from_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "shutdown".into(),
        };
        let reason = close_reason(Some(frame));
        assert_eq!(reason.code, Some(1000));
        assert_eq!(reason.reason, "shutdown");
        assert_eq!(close_reason(None), CloseReason::default());
    }

    #[test]
    fn test_is_normal_close() {
        assert!(is_normal_close(Some(1000)));
        assert!(is_normal_close(Some(1001)));
        assert!(!is_normal_close(Some(1011)));
        assert!(!is_normal_close(None));
    }

    #[tokio::test]
    async fn test_wss_dial_reaches_tls_handshake() {
        // Plain TCP peer that hangs up, so the TLS handshake itself fails
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(stream);
            }
        });

        let err = Transport::connect(&format!("wss://127.0.0.1:{}/ws", port))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, VaultError::Connect(_)));
        assert!(!err.to_string().contains("TLS support not compiled in"), "{}", err);
    }

    #[test]
    fn test_map_ws_error() {
        assert!(matches!(
            map_ws_error(WsError::ConnectionClosed),
            VaultError::Closed(_)
        ));
        assert!(matches!(
            map_ws_error(WsError::Io(std::io::ErrorKind::ConnectionRefused.into())),
            VaultError::Connect(_)
        ));
    }
}
