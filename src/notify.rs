//! Failure presentation
//!
//! Maps a failed call onto exactly one user-facing notice. The host supplies
//! the actual surface (toast, status line, log) through `Notifier`.

use tracing::warn;

use crate::error::{FailureKind, VaultError};
use crate::rpc::RpcError;

/// A message for the user about a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: FailureKind,
    pub message: String,
}

/// Transient notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Notifier that writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        warn!(kind = ?notice.kind, "{}", notice.message);
    }
}

/// Backend error kinds with a dedicated message.
const KIND_MESSAGES: &[(&str, &str)] = &[
    ("WrongPassword", "Wrong password"),
    ("DeserializeFailed", "Failed to parse file"),
];

/// User-facing message for a structured remote error.
pub fn application_message(error: &RpcError) -> String {
    match error.kind() {
        Some(kind) => KIND_MESSAGES
            .iter()
            .find(|(known, _)| *known == kind)
            .map(|(_, message)| message.to_string())
            .unwrap_or_else(|| format!("Error ({})", kind)),
        None => format!("Error ({})", error.message),
    }
}

/// The notice for `error`, or `None` for local failures.
pub fn notice_for(error: &VaultError) -> Option<Notice> {
    let kind = error.failure_kind()?;
    let message = match (kind, error) {
        (_, VaultError::Application(rpc)) => application_message(rpc),
        (FailureKind::Transport, _) => "Connection error".to_string(),
        _ => "Connection closed".to_string(),
    };
    Some(Notice { kind, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloseReason;
    use serde_json::json;

    fn rpc(data: Option<serde_json::Value>, message: &str) -> RpcError {
        RpcError {
            code: -32000,
            message: message.into(),
            data,
        }
    }

    #[test]
    fn test_known_kind_message() {
        let err = rpc(Some(json!({"kind": "WrongPassword"})), "Server Error");
        assert_eq!(application_message(&err), "Wrong password");
        let err = rpc(Some(json!({"kind": "DeserializeFailed"})), "Server Error");
        assert_eq!(application_message(&err), "Failed to parse file");
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let err = rpc(Some(json!({"kind": "InternalError"})), "Server Error");
        assert_eq!(application_message(&err), "Error (InternalError)");
    }

    #[test]
    fn test_no_kind_uses_message() {
        assert_eq!(application_message(&rpc(None, "Method not found")), "Error (Method not found)");
        assert_eq!(
            application_message(&rpc(Some(json!({"other": 1})), "Invalid params")),
            "Error (Invalid params)"
        );
    }

    #[test]
    fn test_notice_per_kind() {
        let notice = notice_for(&VaultError::Connect("refused".into())).unwrap();
        assert_eq!(notice.kind, FailureKind::Transport);
        assert_eq!(notice.message, "Connection error");

        let notice = notice_for(&VaultError::Closed(CloseReason::default())).unwrap();
        assert_eq!(notice.kind, FailureKind::RemoteClose);
        assert_eq!(notice.message, "Connection closed");

        let notice = notice_for(&VaultError::Application(rpc(
            Some(json!({"kind": "WrongPassword"})),
            "Server Error",
        )))
        .unwrap();
        assert_eq!(notice.kind, FailureKind::Application);
        assert_eq!(notice.message, "Wrong password");

        assert!(notice_for(&VaultError::Locked).is_none());
    }
}
