//! Backend Connector
//!
//! Single responsibility: Own the one physical socket and its lifecycle.
//!
//! # State Machine
//!
//! ```text
//!                connect requested            open succeeds
//! Disconnected ───────────────────▶ Connecting ─────────────▶ Connected
//!      ▲                                │                         │
//!      │            open fails          │    socket error/close   │
//!      └────────────────────────────────┴─────────────────────────┘
//! ```
//!
//! There is no `Connected → Connecting` edge: every failure returns fully to
//! `Disconnected` and the next `get_connection()` opens a clean socket. There
//! is no background reconnect.
//!
//! # Waiting on a connect in progress
//!
//! The state lives in a `watch` channel. A caller that sees `Connecting`
//! awaits the next state change and re-checks; a caller that sees
//! `Disconnected` claims the `Connecting` transition atomically, so two
//! callers never open two sockets.
//!
//! The claim is held by a guard. If the claiming future is dropped mid-dial
//! the guard puts the state back to `Disconnected`, and the next caller dials
//! again instead of waiting on an attempt nobody is driving.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::transport::{close_reason, is_normal_close, map_ws_error, Transport, WsSink, WsStream};
use crate::error::{CloseReason, VaultError};

/// Lifecycle of the single backend socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a connected socket went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// The backend (or the network) closed the socket.
    Closed(CloseReason),
    /// The socket reported an error.
    Failed(String),
}

impl Disconnect {
    /// The error reported to callers affected by this disconnect.
    pub fn to_error(&self) -> VaultError {
        match self {
            Disconnect::Closed(reason) => VaultError::Closed(reason.clone()),
            Disconnect::Failed(message) => VaultError::Connect(message.clone()),
        }
    }
}

/// Receives every inbound frame of every socket the connector opens.
///
/// Registered once, at construction.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    /// A text frame arrived.
    async fn on_message(&self, text: String);

    /// The connected socket is gone; state is already `Disconnected`.
    async fn on_disconnect(&self, _reason: &Disconnect) {}
}

/// A usable handle to the live socket.
///
/// Cheap to clone. Holding one does not keep the socket alive; sends on a
/// handle whose socket has gone fail with a transport error.
#[derive(Clone)]
pub struct Connection {
    generation: u64,
    sink: Arc<Mutex<WsSink>>,
}

impl Connection {
    /// Send one text frame.
    pub async fn send_text(&self, text: String) -> Result<(), VaultError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    /// Which socket this handle belongs to (increments per opened socket).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Close our half of the socket without releasing the link.
    #[cfg(test)]
    pub(crate) async fn close(&self) {
        let _ = self.sink.lock().await.close().await;
    }
}

/// Holds the `Connecting` claim; reverts to `Disconnected` on drop unless
/// the socket was installed.
struct ConnectingGuard<'a> {
    state: &'a watch::Sender<ConnectionState>,
    armed: bool,
}

impl ConnectingGuard<'_> {
    /// Publish `Connected` and keep it.
    fn connected(mut self) {
        self.state.send_replace(ConnectionState::Connected);
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

struct Link {
    connection: Connection,
    recv_task: JoinHandle<()>,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    link: Mutex<Option<Link>>,
    handler: Arc<dyn InboundHandler>,
}

impl Shared {
    /// Drop the link for `generation` and return to `Disconnected`.
    ///
    /// A stale generation (the link was already replaced) is ignored.
    async fn release(&self, generation: u64) -> bool {
        let mut link = self.link.lock().await;
        match link.as_ref() {
            Some(current) if current.connection.generation == generation => {
                *link = None;
                self.state.send_replace(ConnectionState::Disconnected);
                true
            }
            _ => false,
        }
    }
}

/// Owner of the backend socket.
pub struct Connector {
    url: String,
    shared: Arc<Shared>,
    generation: AtomicU64,
}

impl Connector {
    /// Create a disconnected connector. No socket is opened until the first
    /// `get_connection()`.
    pub fn new(url: impl Into<String>, handler: Arc<dyn InboundHandler>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            shared: Arc::new(Shared {
                state,
                link: Mutex::new(None),
                handler,
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// The socket URL this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Number of sockets opened (or attempted) so far.
    pub fn connect_attempts(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Get a ready connection, reusing the live socket or opening one.
    ///
    /// - `Connected`: returns the live connection.
    /// - `Disconnected`: opens a socket and returns its outcome.
    /// - `Connecting`: waits for the attempt in progress, then re-checks.
    pub async fn get_connection(&self) -> Result<Connection, VaultError> {
        loop {
            let mut state_rx = self.shared.state.subscribe();
            let state = *state_rx.borrow_and_update();

            match state {
                ConnectionState::Connected => {
                    if let Some(link) = self.shared.link.lock().await.as_ref() {
                        return Ok(link.connection.clone());
                    }
                    // Dropped between the state read and the lock; re-check.
                }
                ConnectionState::Disconnected => {
                    if let Some(claim) = self.claim() {
                        return self.open(claim).await;
                    }
                }
                ConnectionState::Connecting => {
                    debug!("Connect in progress, waiting");
                    state_rx
                        .changed()
                        .await
                        .map_err(|_| VaultError::Connect("Connector shut down".into()))?;
                }
            }
        }
    }

    /// Open a new socket.
    ///
    /// Only a `Disconnected` connector dials; otherwise this behaves like
    /// `get_connection()` and joins the live or in-progress socket.
    pub async fn connect(&self) -> Result<Connection, VaultError> {
        if let Some(claim) = self.claim() {
            return self.open(claim).await;
        }
        self.get_connection().await
    }

    /// Whether `generation` is still the installed socket.
    pub async fn is_current(&self, generation: u64) -> bool {
        matches!(
            self.shared.link.lock().await.as_ref(),
            Some(link) if link.connection.generation == generation
        )
    }

    /// Atomically move `Disconnected → Connecting`. `None` if someone else
    /// holds the claim or a socket is live.
    fn claim(&self) -> Option<ConnectingGuard<'_>> {
        let won = self.shared.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        won.then(|| ConnectingGuard {
            state: &self.shared.state,
            armed: true,
        })
    }

    /// Dial the socket under the `Connecting` claim.
    async fn open(&self, claim: ConnectingGuard<'_>) -> Result<Connection, VaultError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(url = %self.url, generation, "Connecting to backend");

        let transport = match Transport::connect(&self.url).await {
            Ok(transport) => transport,
            Err(e) => {
                drop(claim);
                warn!(url = %self.url, error = %e, "Connect failed");
                return Err(e);
            }
        };

        let (sink, stream) = transport.split();
        let connection = Connection {
            generation,
            sink: Arc::new(Mutex::new(sink)),
        };

        // Hold the link slot while the receiver starts so a socket that dies
        // immediately cannot release before it is installed.
        let mut link = self.shared.link.lock().await;
        let recv_task = tokio::spawn(receiver_loop(stream, Arc::clone(&self.shared), generation));
        *link = Some(Link {
            connection: connection.clone(),
            recv_task,
        });
        claim.connected();
        drop(link);

        info!(url = %self.url, generation, "Connected to backend");
        Ok(connection)
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        if let Ok(mut link) = self.shared.link.try_lock() {
            if let Some(link) = link.take() {
                link.recv_task.abort();
                debug!("Connector dropped, receiver task aborted");
            }
        }
    }
}

/// Receiver loop - one per opened socket.
///
/// Feeds every text frame to the registered handler, then releases the link
/// and reports the disconnect.
async fn receiver_loop(mut stream: WsStream, shared: Arc<Shared>, generation: u64) {
    debug!(generation, "Receiver loop started");

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => shared.handler.on_message(text).await,
            Some(Ok(Message::Binary(data))) => {
                warn!(len = data.len(), "Ignoring binary frame");
            }
            Some(Ok(Message::Close(frame))) => break Disconnect::Closed(close_reason(frame)),
            // Ping/pong handled by tungstenite
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Disconnect::Failed(e.to_string()),
            None => break Disconnect::Closed(CloseReason::default()),
        }
    };

    match &reason {
        Disconnect::Closed(close) if is_normal_close(close.code) => {
            info!(generation, reason = %close, "Backend closed connection")
        }
        Disconnect::Closed(close) => {
            warn!(generation, reason = %close, "Connection closed")
        }
        Disconnect::Failed(error) => warn!(generation, error = %error, "WebSocket error"),
    }

    if shared.release(generation).await {
        shared.handler.on_disconnect(&reason).await;
    }

    debug!(generation, "Receiver loop ended");
}
