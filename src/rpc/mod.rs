//! Backend RPC Transport
//!
//! Everything between a typed call and the bytes on the socket.
//!
//! # Architecture
//!
//! | Module      | Responsibility                                        |
//! |-------------|-------------------------------------------------------|
//! | `transport` | WebSocket open, close-frame and error mapping         |
//! | `protocol`  | JSON-RPC 2.0 envelope encode/decode                   |
//! | `connector` | The one socket and its three-state lifecycle          |
//! | `client`    | Correlation ids, pending table, inbound dispatch      |
//!
//! # Key Design Principles
//!
//! ## 1. One socket, demand-driven
//!
//! - No socket is opened until the first call
//! - A failure always returns to `Disconnected`; the next call reconnects
//! - Concurrent callers share the connect in progress, they never dial twice
//!
//! ## 2. Every reply settles exactly one call
//!
//! - Ids are assigned in `call()` order starting at 1; 0 is never used
//! - A pending entry is removed exactly once: by its reply, by a send
//!   failure, or by a disconnect
//! - Frames that cannot be routed are logged, never raised
//!
//! # Usage
//!
//! ```ignore
//! use vault_client::rpc::{Client, ClientOptions};
//! use serde_json::json;
//!
//! let client = Client::new("ws://127.0.0.1:8888/ws", ClientOptions::default());
//! let is_set = client.call("is_master_password_set", vec![]).await?;
//! let entry = client.call("get_password", vec![json!(master), json!(1)]).await?;
//! ```

mod client;
mod connector;
mod protocol;
mod transport;

pub use client::{Client, ClientOptions};
pub use connector::{Connection, ConnectionState, Connector, Disconnect, InboundHandler};
pub use protocol::{decode_response, encode_request, Inbound, RpcError, JSONRPC_VERSION};
