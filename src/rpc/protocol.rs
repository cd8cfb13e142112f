//! JSON-RPC Wire Protocol
//!
//! Single responsibility: Encode request envelopes and decode response envelopes.
//!
//! # Wire Format
//!
//! ## Request
//! ```text
//! {"jsonrpc": "2.0", "id": <u64>, "method": <string>, "params": [<any>...]}
//! ```
//!
//! ## Response
//! ```text
//! {"id": <u64>, "result": <any>}
//! {"id": <u64>, "error": {"code": <int>, "message": <string>, "data": {"kind": <string>, ...}?}}
//! ```
//!
//! An id of zero (or a missing id) marks a message that cannot be correlated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VaultError;

/// Protocol version tag carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Code used when the backend sends an error body we cannot parse.
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

/// Structured error body of a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// The backend's error kind (`data.kind`), e.g. `"WrongPassword"`.
    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref()?.get("kind")?.as_str()
    }
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// A decoded, correlatable response.
#[derive(Debug)]
pub struct Inbound {
    pub id: u64,
    pub outcome: Result<Value, RpcError>,
}

/// Encode a call into its request envelope.
pub fn encode_request(id: u64, method: &str, params: &[Value]) -> Result<String, VaultError> {
    let request = Request {
        jsonrpc: JSONRPC_VERSION,
        id,
        method,
        params,
    };
    Ok(serde_json::to_string(&request)?)
}

/// Decode a raw text frame into a correlatable response.
///
/// Returns `VaultError::Protocol` for anything that cannot be routed:
/// invalid JSON, a non-object, or a missing/zero id.
pub fn decode_response(text: &str) -> Result<Inbound, VaultError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| VaultError::Protocol(format!("Failed to decode response: {}", e)))?;
    if !value.is_object() {
        return Err(VaultError::Protocol("Response is not an object".into()));
    }
    let raw: RawResponse = serde_json::from_value(value)
        .map_err(|e| VaultError::Protocol(format!("Malformed response envelope: {}", e)))?;

    let id = match raw.id {
        Some(id) if id != 0 => id,
        _ => return Err(VaultError::Protocol("Response without id".into())),
    };

    let outcome = match raw.error {
        Some(error) => Err(parse_error(error)),
        None => Ok(raw.result.unwrap_or(Value::Null)),
    };

    Ok(Inbound { id, outcome })
}

fn parse_error(error: Value) -> RpcError {
    match serde_json::from_value::<RpcError>(error.clone()) {
        Ok(err) => err,
        Err(_) => RpcError {
            code: INTERNAL_ERROR,
            message: error.to_string(),
            data: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_request_envelope() {
        let text = encode_request(7, "get_password", &[json!("secret"), json!(1)]).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": 7, "method": "get_password", "params": ["secret", 1]})
        );
    }

    #[test]
    fn test_encode_request_without_params() {
        let text = encode_request(1, "is_master_password_set", &[]).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["params"], json!([]));
    }

    #[test]
    fn test_decode_result() {
        let inbound = decode_response(r#"{"id":1,"result":false}"#).unwrap();
        assert_eq!(inbound.id, 1);
        assert_eq!(inbound.outcome.unwrap(), json!(false));
    }

    #[test]
    fn test_decode_missing_result_is_null() {
        let inbound = decode_response(r#"{"jsonrpc":"2.0","id":4}"#).unwrap();
        assert_eq!(inbound.outcome.unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_null_error_is_success() {
        let inbound = decode_response(r#"{"id":2,"result":3,"error":null}"#).unwrap();
        assert_eq!(inbound.outcome.unwrap(), json!(3));
    }

    #[test]
    fn test_decode_error_with_kind() {
        let inbound = decode_response(
            r#"{"id":3,"error":{"code":-1,"message":"bad","data":{"kind":"WrongPassword"}}}"#,
        )
        .unwrap();
        let err = inbound.outcome.unwrap_err();
        assert_eq!(err.code, -1);
        assert_eq!(err.message, "bad");
        assert_eq!(err.kind(), Some("WrongPassword"));
    }

    #[test]
    fn test_decode_malformed_error_body() {
        let inbound = decode_response(r#"{"id":5,"error":"boom"}"#).unwrap();
        let err = inbound.outcome.unwrap_err();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn test_decode_uncorrelatable() {
        assert!(matches!(
            decode_response(r#"{"result":5}"#),
            Err(VaultError::Protocol(_))
        ));
        assert!(matches!(
            decode_response(r#"{"id":0,"result":5}"#),
            Err(VaultError::Protocol(_))
        ));
        assert!(matches!(
            decode_response("not json"),
            Err(VaultError::Protocol(_))
        ));
        assert!(matches!(
            decode_response("[1,2]"),
            Err(VaultError::Protocol(_))
        ));
    }
}
