//! Request Multiplexer
//!
//! Single responsibility: Turn many concurrent `call()`s into correlated
//! request/response pairs over the one socket the `Connector` owns.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                        Client                           │
//! │  - Assigns correlation ids (1, 2, 3, ...)               │
//! │  - Registers a pending entry per call                   │
//! │  - Awaits the oneshot the dispatcher settles            │
//! └────────────────────────────────────────────────────────┘
//!            │ get_connection()              ▲ on_message()
//!            ▼                               │
//! ┌────────────────────────────────────────────────────────┐
//! │                      Connector                          │
//! │  - One socket, three states                             │
//! │  - Feeds every frame to the Dispatcher                  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Replies settle in wire order, independent of send order. A reply whose id
//! is not pending, or a frame without an id, is logged and dropped.
//!
//! # Disconnects
//!
//! With `reject_pending_on_disconnect` (the default) every call still pending
//! when the socket closes or errors is rejected with that failure. Without it,
//! those calls stay pending forever.
//!
//! A call registers its entry and then checks that the socket it was handed
//! is still installed. Either the disconnect drain sees the entry, or the call
//! sees the socket is gone and rejects itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use super::connector::{Connection, Connector, Disconnect, InboundHandler};
use super::protocol::{decode_response, encode_request};
use crate::error::{CloseReason, VaultError};

type Settle = oneshot::Sender<Result<Value, VaultError>>;
type PendingTable = Arc<Mutex<HashMap<u64, Settle>>>;

/// Options for the request multiplexer.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Reject every pending call when the socket closes or errors.
    pub reject_pending_on_disconnect: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            reject_pending_on_disconnect: true,
        }
    }
}

/// Inbound side: routes responses to their pending entries.
struct Dispatcher {
    pending: PendingTable,
    reject_pending_on_disconnect: bool,
}

#[async_trait]
impl InboundHandler for Dispatcher {
    async fn on_message(&self, text: String) {
        let inbound = match decode_response(&text) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping unroutable message");
                return;
            }
        };

        let entry = self.pending.lock().await.remove(&inbound.id);
        match entry {
            Some(tx) => {
                debug!(id = inbound.id, ok = inbound.outcome.is_ok(), "Settling call");
                let _ = tx.send(inbound.outcome.map_err(VaultError::Application));
            }
            None => warn!(id = inbound.id, "Response for unknown request id, dropping"),
        }
    }

    async fn on_disconnect(&self, reason: &Disconnect) {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            return;
        }
        if !self.reject_pending_on_disconnect {
            warn!(count = pending.len(), "Socket gone with calls still pending");
            return;
        }
        for (id, tx) in pending.drain() {
            debug!(id, "Rejecting pending call");
            let _ = tx.send(Err(reason.to_error()));
        }
    }
}

/// JSON-RPC client multiplexing calls over one backend socket.
///
/// Wrap in `Arc` to share between tasks.
pub struct Client {
    connector: Connector,
    next_id: AtomicU64,
    pending: PendingTable,
    reject_pending_on_disconnect: bool,
}

impl Client {
    /// Create a client for the socket at `url`. Nothing is dialed until the
    /// first call.
    pub fn new(url: impl Into<String>, options: ClientOptions) -> Self {
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = Dispatcher {
            pending: Arc::clone(&pending),
            reject_pending_on_disconnect: options.reject_pending_on_disconnect,
        };

        Self {
            connector: Connector::new(url, Arc::new(dispatcher)),
            next_id: AtomicU64::new(1),
            pending,
            reject_pending_on_disconnect: options.reject_pending_on_disconnect,
        }
    }

    /// The connector owning the socket.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Number of calls awaiting a reply.
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Call a remote procedure.
    ///
    /// Resolves with the `result` of the response whose id matches this call.
    ///
    /// # Errors
    /// - `Connect` / `Closed` if no connection could be obtained (nothing is
    ///   registered in that case), if the send fails, or if the socket goes
    ///   away while the call is pending and rejection is enabled
    /// - `Application` if the backend answered with an error envelope
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, VaultError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = encode_request(id, method, &params)?;

        let connection = self.connector.get_connection().await?;

        debug!(id, method = %method, generation = connection.generation(), "Sending call");

        let response_rx = self.register(id, &connection).await?;

        if let Err(e) = connection.send_text(request).await {
            self.pending.lock().await.remove(&id);
            warn!(id, method = %method, error = %e, "Send failed");
            return Err(e);
        }

        match response_rx.await {
            Ok(result) => result,
            // Sender dropped without settling: the client is being torn down
            Err(_) => Err(VaultError::Closed(CloseReason {
                code: None,
                reason: "client dropped".into(),
            })),
        }
    }

    /// Add the pending entry for `id`, bound to `connection`'s socket.
    ///
    /// If that socket was released before the entry landed, the disconnect
    /// drain has already run without it, so the call is rejected here.
    async fn register(
        &self,
        id: u64,
        connection: &Connection,
    ) -> Result<oneshot::Receiver<Result<Value, VaultError>>, VaultError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, response_tx);

        if !self.reject_pending_on_disconnect
            || self.connector.is_current(connection.generation()).await
        {
            return Ok(response_rx);
        }

        match self.pending.lock().await.remove(&id) {
            Some(_) => {
                warn!(id, generation = connection.generation(), "Socket gone before send");
                Err(VaultError::Closed(CloseReason {
                    code: None,
                    reason: "connection lost before send".into(),
                }))
            }
            // The drain got there first and settled the entry
            None => Ok(response_rx),
        }
    }
}
