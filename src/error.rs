//! Error types for vault-client

use std::fmt;

use thiserror::Error;

use crate::rpc::RpcError;

/// Close details reported by the backend (or synthesized when the socket
/// ended without a close frame).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseReason {
    /// WebSocket close code, if the peer sent one
    pub code: Option<u16>,
    /// Close reason text (may be empty)
    pub reason: String,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.reason.is_empty()) {
            (Some(code), false) => write!(f, "code {}: {}", code, self.reason),
            (Some(code), true) => write!(f, "code {}", code),
            (None, false) => f.write_str(&self.reason),
            (None, true) => f.write_str("no close frame"),
        }
    }
}

#[derive(Error, Debug)]
pub enum VaultError {
    /// The socket failed to open, or errored while connected.
    #[error("Connection error: {0}")]
    Connect(String),

    /// The socket was closed, before opening or while connected.
    #[error("Connection closed ({0})")]
    Closed(CloseReason),

    /// The backend answered the call with an error envelope.
    #[error("Remote error: {0}")]
    Application(RpcError),

    /// Malformed or unroutable inbound message.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vault is locked: no master password in session")]
    Locked,
}

/// The three user-facing buckets a failed remote call falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Structured error body from the backend
    Application,
    /// Socket-level error
    Transport,
    /// Socket closed before or while the call was outstanding
    RemoteClose,
}

impl VaultError {
    /// Classify this error for presentation.
    ///
    /// Local failures (config, IO, result decoding, locked session) have no
    /// bucket and return `None`.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            VaultError::Application(_) => Some(FailureKind::Application),
            VaultError::Connect(_) => Some(FailureKind::Transport),
            VaultError::Closed(_) => Some(FailureKind::RemoteClose),
            _ => None,
        }
    }

    /// The structured remote error, if this is an application failure.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            VaultError::Application(err) => Some(err),
            _ => None,
        }
    }
}
