//! Codec for JSON-RPC 1.1 envelopes
//!
//! This module converts between envelope types and bytes, and enforces the
//! result contract of generated operations.
//!
//! # Result Contract
//!
//! A typed operation returns its output wrapped in a JSON array:
//!
//! ```json
//! {"version": "1.1", "result": [{"metrics_result": {...}}]}
//! ```
//!
//! [`unwrap_single`] returns that single element. An empty array, a missing
//! result, or a non-array result is a contract violation and yields
//! `Error::Protocol` instead of a default value.
//!
//! # Examples
//!
//! ```rust
//! use kbmetrics_core::codec;
//! use serde_json::Value;
//!
//! let body = br#"{"version":"1.1","result":[{"state":"OK"}]}"#;
//! let response = codec::decode_response(body).unwrap();
//! let result = codec::into_result(response).unwrap();
//! let status: Value = codec::unwrap_single(result).unwrap();
//! assert_eq!(status["state"], "OK");
//! ```

use crate::error::{Error, RemoteErrorData, Result};
use crate::types::{RpcRequest, RpcResponse};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode any serializable value to a JSON string
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a request envelope to JSON bytes
pub fn encode_request(req: &RpcRequest) -> Result<Vec<u8>> {
    serde_json::to_vec(req).map_err(|e| Error::Serialization(e.to_string()))
}

/// Write a request envelope to any writer
///
/// Used when the request body is spooled to storage instead of memory.
pub fn write_request<W: std::io::Write>(writer: W, req: &RpcRequest) -> Result<()> {
    serde_json::to_writer(writer, req).map_err(|e| Error::Serialization(e.to_string()))
}

/// Convert a record into a positional argument
pub fn to_param<T: Serialize>(params: &T) -> Result<Value> {
    serde_json::to_value(params).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a response envelope
///
/// # Errors
///
/// Returns `Error::Protocol` when the body is not JSON or not an envelope
/// object. The body is quoted (truncated) in the message, since it is often
/// an HTML error page from a proxy.
pub fn decode_response(body: &[u8]) -> Result<RpcResponse> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        Error::Protocol(format!(
            "response is not valid JSON ({}): {}",
            e,
            preview(body)
        ))
    })?;

    if !value.is_object() {
        return Err(Error::Protocol(format!(
            "response is not a JSON-RPC envelope: {}",
            preview(body)
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::Protocol(format!("malformed response envelope: {}", e)))
}

/// Extract the result from a response envelope
///
/// An error envelope becomes `Error::Remote`, whatever shape its `error`
/// member has; an envelope with neither member is reported the way SDK
/// callers do, as an unknown server error.
pub fn into_result(response: RpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(Error::Remote(remote_error(error)));
    }
    response
        .result
        .ok_or_else(|| Error::Protocol("An unknown server error occurred: response has no result".into()))
}

/// Normalize the `error` member of an envelope
///
/// Error objects decode as-is. A bare string becomes the message; any other
/// value is kept as detail.
fn remote_error(error: Value) -> RemoteErrorData {
    match error {
        Value::String(message) => RemoteErrorData::new(0, message),
        Value::Object(_) => serde_json::from_value(error.clone())
            .unwrap_or_else(|_| RemoteErrorData::with_detail(0, "malformed error object", error)),
        other => RemoteErrorData::with_detail(0, "malformed error object", other),
    }
}

/// Decode the single element of a result array
///
/// # Errors
///
/// - `Error::Protocol` if `result` is not an array or is empty
/// - `Error::Serialization` if the element does not decode into `T`
///
/// # Examples
///
/// ```rust
/// use kbmetrics_core::{codec, Error};
/// use serde_json::{json, Value};
///
/// let empty = codec::unwrap_single::<Value>(json!([]));
/// assert!(matches!(empty, Err(Error::Protocol(_))));
/// ```
pub fn unwrap_single<T: DeserializeOwned>(result: Value) -> Result<T> {
    let items = match result {
        Value::Array(items) => items,
        other => {
            return Err(Error::Protocol(format!(
                "expected result array, got {}",
                json_kind(&other)
            )))
        }
    };

    let first = items
        .into_iter()
        .next()
        .ok_or_else(|| Error::Protocol("result array is empty".into()))?;

    serde_json::from_value(first).map_err(|e| Error::Serialization(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const PREVIEW_LIMIT: usize = 200;

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_LIMIT {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(PREVIEW_LIMIT).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_success_envelope() {
        let resp = decode_response(br#"{"version":"1.1","id":"1","result":[{"a":1}]}"#).unwrap();
        assert_eq!(resp.result, Some(json!([{"a": 1}])));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode_response(b"<html>502 Bad Gateway</html>").unwrap_err();
        match err {
            Error::Protocol(msg) => assert!(msg.contains("502 Bad Gateway")),
            other => panic!("Expected Protocol error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bare_array() {
        assert!(matches!(decode_response(b"[1,2]"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_into_result_maps_error_envelope() {
        let resp = RpcResponse::failure(RemoteErrorData::new(-32500, "user not found"));
        match into_result(resp) {
            Err(Error::Remote(data)) => {
                assert_eq!(data.code, -32500);
                assert_eq!(data.message, "user not found");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_envelope_without_message_is_remote() {
        let resp = decode_response(br#"{"version":"1.1","error":{"name":"JSONRPCError","code":-32500}}"#).unwrap();
        match into_result(resp) {
            Err(Error::Remote(data)) => {
                assert_eq!(data.code, -32500);
                assert_eq!(data.message, "");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_string_error_envelope_is_remote() {
        let resp = decode_response(br#"{"version":"1.1","error":"Internal server error"}"#).unwrap();
        match into_result(resp) {
            Err(Error::Remote(data)) => {
                assert_eq!(data.name, "JSONRPCError");
                assert_eq!(data.message, "Internal server error");
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_odd_error_member_is_kept_as_detail() {
        let resp = decode_response(br#"{"error":{"message":42}}"#).unwrap();
        match into_result(resp) {
            Err(Error::Remote(data)) => assert_eq!(data.detail().as_deref(), Some(r#"{"message":42}"#)),
            other => panic!("Expected Remote error, got {:?}", other),
        }

        let resp = decode_response(br#"{"error":500}"#).unwrap();
        assert!(matches!(into_result(resp), Err(Error::Remote(_))));
    }

    #[test]
    fn test_into_result_requires_result() {
        assert!(matches!(into_result(RpcResponse::default()), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unwrap_single_takes_first_element() {
        let value: Value = unwrap_single(json!([{"job_states": {"queued": 2}}, {"ignored": true}])).unwrap();
        assert_eq!(value, json!({"job_states": {"queued": 2}}));
    }

    #[test]
    fn test_unwrap_single_rejects_empty_array() {
        let err = unwrap_single::<Value>(json!([])).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("empty")));
    }

    #[test]
    fn test_unwrap_single_rejects_object_result() {
        let err = unwrap_single::<Value>(json!({"state": "OK"})).unwrap_err();
        assert!(matches!(err, Error::Protocol(ref msg) if msg.contains("object")));
    }

    #[test]
    fn test_unwrap_single_type_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            count: u32,
        }
        let err = unwrap_single::<Strict>(json!([{"count": "many"}])).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_write_request_matches_encode() {
        let req = RpcRequest::new("svc.op", vec![json!(1)], None);
        let mut buf = Vec::new();
        write_request(&mut buf, &req).unwrap();
        assert_eq!(buf, encode_request(&req).unwrap());
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let body = "x".repeat(500);
        let shown = preview(body.as_bytes());
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), PREVIEW_LIMIT + 3);
    }
}
