//! Vault Client - thin client for the vault password manager
//!
//! Encryption and storage live in a separate backend process reached over a
//! persistent WebSocket. This crate is everything on the near side of that
//! socket.
//!
//! ## Architecture
//!
//! ```text
//! VaultContext ── owns ──▶ RemoteVault (VaultRpc) ──▶ Client ──▶ Connector ──▶ socket
//!      │                        │
//!      └─ session password      └─ Notifier (failure notices)
//! ```
//!
//! - **Connector**: the one socket, `Disconnected → Connecting → Connected`
//! - **Client**: correlation ids, pending table, inbound dispatch
//! - **RemoteVault**: one typed method per backend procedure
//!
//! ## Failure buckets
//!
//! | Bucket       | Error                     | Notice              |
//! |--------------|---------------------------|---------------------|
//! | Transport    | `VaultError::Connect`     | "Connection error"  |
//! | Remote close | `VaultError::Closed`      | "Connection closed" |
//! | Application  | `VaultError::Application` | per error kind      |

pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod rpc;
pub mod service;
pub mod types;

// Re-exports
pub use config::Config;
pub use context::VaultContext;
pub use error::{CloseReason, FailureKind, VaultError};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use rpc::{Client, ClientOptions, ConnectionState, RpcError};
pub use service::{RemoteVault, VaultRpc};
pub use types::{Count, ExportData, ImportSource, Item, Password, PasswordOption};
