//! Client context
//!
//! The composition root builds one `VaultContext` and passes it by reference
//! to everything that talks to the backend. It owns the client, the typed
//! procedure surface, and the session's master password.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::error::VaultError;
use crate::notify::Notifier;
use crate::rpc::{Client, ClientOptions};
use crate::service::{RemoteVault, VaultRpc};

#[derive(Default)]
struct Session {
    master_password: Option<String>,
}

pub struct VaultContext {
    rpc: RemoteVault,
    session: RwLock<Session>,
}

impl VaultContext {
    /// Build a context for the endpoint described by `config`.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, VaultError> {
        let endpoint = config.endpoint()?;
        Ok(Self::with_endpoint(
            endpoint.as_str(),
            ClientOptions {
                reject_pending_on_disconnect: config.reject_pending_on_disconnect,
            },
            notifier,
        ))
    }

    /// Build a context for an explicit socket URL.
    pub fn with_endpoint(url: &str, options: ClientOptions, notifier: Arc<dyn Notifier>) -> Self {
        info!(endpoint = %url, "Creating vault context");
        let client = Arc::new(Client::new(url, options));
        Self {
            rpc: RemoteVault::new(client, notifier),
            session: RwLock::new(Session::default()),
        }
    }

    /// Typed procedure surface.
    pub fn rpc(&self) -> &RemoteVault {
        &self.rpc
    }

    /// The shared client.
    pub fn client(&self) -> &Arc<Client> {
        self.rpc.client()
    }

    /// Verify `master_password` with the backend and keep it for this session.
    ///
    /// Returns `false` (and leaves the session locked) when it does not match.
    pub async fn unlock(&self, master_password: &str) -> Result<bool, VaultError> {
        if !self.rpc.verify_master_password(master_password).await? {
            return Ok(false);
        }
        self.session.write().await.master_password = Some(master_password.to_string());
        Ok(true)
    }

    /// Forget the master password.
    pub async fn lock(&self) {
        self.session.write().await.master_password = None;
    }

    pub async fn is_unlocked(&self) -> bool {
        self.session.read().await.master_password.is_some()
    }

    /// The session's master password, for procedures that need one.
    pub async fn master_password(&self) -> Result<String, VaultError> {
        self.session
            .read()
            .await
            .master_password
            .clone()
            .ok_or(VaultError::Locked)
    }
}
