//! Configuration for vault-client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::VaultError;

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vault-client")
        .join("config.toml")
}

/// Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Page/host origin the backend is served from
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Force this port on the derived socket URL (development backends)
    #[serde(default)]
    pub dev_port: Option<u16>,

    /// Path of the RPC socket on the backend
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,

    /// Reject in-flight calls when the socket closes or errors.
    /// `false` leaves them pending.
    #[serde(default = "default_true")]
    pub reject_pending_on_disconnect: bool,
}

fn default_origin() -> String {
    "http://127.0.0.1:8888".to_string()
}

fn default_rpc_path() -> String {
    "/ws".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            dev_port: None,
            rpc_path: default_rpc_path(),
            reject_pending_on_disconnect: true,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VaultError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VaultError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| VaultError::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Socket URL derived from the origin.
    pub fn endpoint(&self) -> Result<Url, VaultError> {
        rpc_endpoint(&self.origin, &self.rpc_path, self.dev_port)
    }
}

/// Derive the RPC socket URL from a page origin.
///
/// `http` becomes `ws` and `https` becomes `wss` (`ws`/`wss` are kept), the
/// path is replaced by `rpc_path`, and `port` overrides the origin's port.
pub fn rpc_endpoint(origin: &str, rpc_path: &str, port: Option<u16>) -> Result<Url, VaultError> {
    let mut url = Url::parse(origin)
        .map_err(|e| VaultError::Config(format!("Invalid origin {:?}: {}", origin, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(VaultError::Config(format!(
                "Unsupported origin scheme: {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| VaultError::Config(format!("Cannot use scheme {} for {}", scheme, origin)))?;

    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| VaultError::Config(format!("Origin {} cannot carry a port", origin)))?;
    }

    url.set_path(rpc_path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
