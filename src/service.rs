//! Typed remote procedures
//!
//! `VaultRpc` lists every procedure the backend exposes, one method each.
//! `RemoteVault` forwards them to `Client::call`, reports failures through a
//! `Notifier`, and hands the error back to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::VaultError;
use crate::notify::{notice_for, Notifier};
use crate::rpc::Client;
use crate::types::{Count, ExportData, ImportSource, Item, Password, PasswordOption};

/// The backend's remote procedure catalog.
#[async_trait]
pub trait VaultRpc: Send + Sync {
    /// Whether a master password has been set up.
    async fn is_master_password_set(&self) -> Result<bool, VaultError>;

    /// Set the initial master password.
    async fn set_master_password(&self, master_password: &str) -> Result<(), VaultError>;

    /// Check a master password; `false` when it does not match.
    async fn verify_master_password(&self, master_password: &str) -> Result<bool, VaultError>;

    /// All entries, ids and names only.
    async fn list_password(&self, master_password: &str) -> Result<Vec<Item>, VaultError>;

    async fn get_password(&self, master_password: &str, id: u64) -> Result<Password, VaultError>;

    async fn add_password(
        &self,
        master_password: &str,
        name: &str,
        password: &str,
    ) -> Result<(), VaultError>;

    async fn update_password(
        &self,
        master_password: &str,
        id: u64,
        name: &str,
        password: &str,
    ) -> Result<(), VaultError>;

    async fn delete_password(&self, master_password: &str, id: u64) -> Result<(), VaultError>;

    /// Import an export, decrypting it with `decrypt_password` (defaults to
    /// the master password on the backend).
    async fn import_password(
        &self,
        master_password: &str,
        decrypt_password: Option<&str>,
        source: &ImportSource,
    ) -> Result<Count, VaultError>;

    /// Export all entries. With `file` the backend writes there and returns
    /// `None`; otherwise the rows come back inline.
    async fn export_password(
        &self,
        master_password: &str,
        file: Option<&str>,
    ) -> Result<Option<ExportData>, VaultError>;

    /// Generate a random password.
    async fn make_password(&self, option: &PasswordOption) -> Result<String, VaultError>;

    /// Re-wrap the vault key under a new master password.
    async fn change_password(
        &self,
        master_password: &str,
        new_password: &str,
    ) -> Result<(), VaultError>;

    /// Port of the network-accessible listener, if enabled.
    async fn get_network_port(&self, master_password: &str) -> Result<Option<u16>, VaultError>;

    /// Start the network-accessible listener and return its port.
    async fn enable_network_access(&self, master_password: &str) -> Result<u16, VaultError>;

    async fn disable_network_access(&self, master_password: &str) -> Result<(), VaultError>;
}

/// `VaultRpc` over a live `Client`.
#[derive(Clone)]
pub struct RemoteVault {
    client: Arc<Client>,
    notifier: Arc<dyn Notifier>,
}

impl RemoteVault {
    pub fn new(client: Arc<Client>, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Call `method` and decode its result, reporting any failure.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, VaultError> {
        let value = self
            .client
            .call(method, params)
            .await
            .map_err(|e| self.report(method, e))?;

        serde_json::from_value(value).map_err(|e| {
            error!(method = %method, error = %e, "Unexpected result shape");
            VaultError::Json(e)
        })
    }

    fn report(&self, method: &str, err: VaultError) -> VaultError {
        match notice_for(&err) {
            Some(notice) => {
                debug!(method = %method, kind = ?notice.kind, "Call failed");
                self.notifier.notify(&notice);
            }
            None => debug!(method = %method, error = %err, "Call failed locally"),
        }
        err
    }
}

#[async_trait]
impl VaultRpc for RemoteVault {
    async fn is_master_password_set(&self) -> Result<bool, VaultError> {
        self.invoke("is_master_password_set", vec![]).await
    }

    async fn set_master_password(&self, master_password: &str) -> Result<(), VaultError> {
        self.invoke("set_master_password", vec![json!(master_password)])
            .await
    }

    async fn verify_master_password(&self, master_password: &str) -> Result<bool, VaultError> {
        self.invoke("verify_master_password", vec![json!(master_password)])
            .await
    }

    async fn list_password(&self, master_password: &str) -> Result<Vec<Item>, VaultError> {
        self.invoke("list_password", vec![json!(master_password)])
            .await
    }

    async fn get_password(&self, master_password: &str, id: u64) -> Result<Password, VaultError> {
        self.invoke("get_password", vec![json!(master_password), json!(id)])
            .await
    }

    async fn add_password(
        &self,
        master_password: &str,
        name: &str,
        password: &str,
    ) -> Result<(), VaultError> {
        self.invoke(
            "add_password",
            vec![json!(master_password), json!(name), json!(password)],
        )
        .await
    }

    async fn update_password(
        &self,
        master_password: &str,
        id: u64,
        name: &str,
        password: &str,
    ) -> Result<(), VaultError> {
        self.invoke(
            "update_password",
            vec![json!(master_password), json!(id), json!(name), json!(password)],
        )
        .await
    }

    async fn delete_password(&self, master_password: &str, id: u64) -> Result<(), VaultError> {
        self.invoke("delete_password", vec![json!(master_password), json!(id)])
            .await
    }

    async fn import_password(
        &self,
        master_password: &str,
        decrypt_password: Option<&str>,
        source: &ImportSource,
    ) -> Result<Count, VaultError> {
        self.invoke(
            "import_password",
            vec![
                json!(master_password),
                json!(decrypt_password),
                serde_json::to_value(source)?,
            ],
        )
        .await
    }

    async fn export_password(
        &self,
        master_password: &str,
        file: Option<&str>,
    ) -> Result<Option<ExportData>, VaultError> {
        self.invoke("export_password", vec![json!(master_password), json!(file)])
            .await
    }

    async fn make_password(&self, option: &PasswordOption) -> Result<String, VaultError> {
        self.invoke("make_password", vec![serde_json::to_value(option)?])
            .await
    }

    async fn change_password(
        &self,
        master_password: &str,
        new_password: &str,
    ) -> Result<(), VaultError> {
        self.invoke(
            "change_password",
            vec![json!(master_password), json!(new_password)],
        )
        .await
    }

    async fn get_network_port(&self, master_password: &str) -> Result<Option<u16>, VaultError> {
        self.invoke("get_network_port", vec![json!(master_password)])
            .await
    }

    async fn enable_network_access(&self, master_password: &str) -> Result<u16, VaultError> {
        self.invoke("enable_network_access", vec![json!(master_password)])
            .await
    }

    async fn disable_network_access(&self, master_password: &str) -> Result<(), VaultError> {
        self.invoke("disable_network_access", vec![json!(master_password)])
            .await
    }
}
