//! JSON-RPC 1.1 envelope types
//!
//! SDK-generated services speak a JSON-RPC 1.1 dialect over HTTP POST. This
//! module models the three objects that appear on the wire:
//!
//! 1. **RpcRequest**: `{"params": [...], "method": "svc.op", "version": "1.1", "id": "...", "context": {...}}`
//! 2. **RpcContext**: optional per-call annotations (call stack, run id,
//!    provenance, service version pin)
//! 3. **RpcResponse**: `{"version": "1.1", "id": "...", "result": [...]}` or
//!    the same envelope with an `error` member instead of `result`
//!
//! # Positional Parameters
//!
//! Unlike JSON-RPC 2.0 named params, `params` is always an array. Typed
//! operations send exactly one element (the parameter record); zero-argument
//! operations such as `status` send an empty array.
//!
//! # Request IDs
//!
//! IDs are random numeric strings. The transport is strictly one request per
//! HTTP exchange, so the id is only echoed back for log correlation.

use crate::error::RemoteErrorData;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version sent in every request
pub const JSONRPC_VERSION: &str = "1.1";

/// Context key that pins the deployed service release handling a call
pub const SERVICE_VERSION_KEY: &str = "service_ver";

/// Build a dotted remote method name: `<service>.<operation>`
///
/// # Examples
///
/// ```rust
/// use kbmetrics_core::types::method_name;
///
/// assert_eq!(method_name("kb_Metrics", "status"), "kb_Metrics.status");
/// ```
pub fn method_name(service: &str, operation: &str) -> String {
    format!("{}.{}", service, operation)
}

/// Call-context annotation forwarded with a single request
///
/// None of these members are part of the business payload; the service uses
/// them for tracing, provenance recording and release selection. Members the
/// caller leaves unset are omitted from the wire. Anything else, including the
/// `service_ver` pin, lives in the extension map.
///
/// # Examples
///
/// ```rust
/// use kbmetrics_core::RpcContext;
///
/// let ctx = RpcContext::new()
///     .with_run_id("run-42")
///     .with_service_version("beta");
/// assert_eq!(ctx.service_version(), Some("beta"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcContext {
    /// Chain of calls leading to this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_stack: Option<Vec<Value>>,

    /// Identifier of the app run this call belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Provenance actions to attach to objects created by the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Vec<Value>>,

    /// Unrecognized or free-form annotations
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl RpcContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_stack(mut self, call_stack: Vec<Value>) -> Self {
        self.call_stack = Some(call_stack);
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_provenance(mut self, provenance: Vec<Value>) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Add an arbitrary annotation
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.additional_properties.insert(key.into(), value);
        self
    }

    /// Pin the service release that should handle this call
    pub fn with_service_version(self, version: impl Into<String>) -> Self {
        self.with_property(SERVICE_VERSION_KEY, Value::String(version.into()))
    }

    /// The pinned service release, if any
    pub fn service_version(&self) -> Option<&str> {
        self.additional_properties
            .get(SERVICE_VERSION_KEY)
            .and_then(Value::as_str)
    }
}

/// JSON-RPC 1.1 request envelope
///
/// Field order on the wire follows declaration order:
/// `params`, `method`, `version`, `id`, `context`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Positional arguments (zero or one element for generated operations)
    pub params: Vec<Value>,
    /// Dotted remote method name
    pub method: String,
    /// Always "1.1"
    pub version: String,
    /// Random correlation id
    pub id: String,
    /// Optional call-context annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RpcContext>,
}

impl RpcRequest {
    /// Create a request with a freshly generated id
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kbmetrics_core::RpcRequest;
    /// use serde_json::json;
    ///
    /// let req = RpcRequest::new("kb_Metrics.get_user_details", vec![json!({"user_ids": ["u1"]})], None);
    /// assert_eq!(req.version, "1.1");
    /// assert!(!req.id.is_empty());
    /// ```
    pub fn new(method: impl Into<String>, params: Vec<Value>, context: Option<RpcContext>) -> Self {
        Self {
            params,
            method: method.into(),
            version: JSONRPC_VERSION.to_string(),
            id: generate_id(),
            context,
        }
    }
}

/// Random numeric-string request id
fn generate_id() -> String {
    rand::thread_rng().gen::<u64>().to_string()
}

/// JSON-RPC 1.1 response envelope
///
/// A well-formed response has exactly one of `result` or `error`. Both are
/// modelled as optional so that a malformed envelope still decodes and the
/// codec can report the violation precisely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Raw error member; servers send either an error object or a bare
    /// string, see `codec::into_result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// Create a success envelope
    pub fn success(result: Value) -> Self {
        Self {
            version: Some(JSONRPC_VERSION.to_string()),
            result: Some(result),
            ..Default::default()
        }
    }

    /// Create an error envelope
    pub fn failure(error: RemoteErrorData) -> Self {
        Self {
            version: Some(JSONRPC_VERSION.to_string()),
            error: serde_json::to_value(error).ok(),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
