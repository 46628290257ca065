//! Error types for kbmetrics
//!
//! This module defines the error taxonomy shared by every kbmetrics crate.
//! It provides two main types:
//!
//! - **Error**: Application-level errors returned by the client (uses thiserror)
//! - **RemoteErrorData**: The JSON-RPC 1.1 error object sent back by the service
//!
//! # Error Categories
//!
//! Callers usually care about *where* a call failed, not just that it failed:
//!
//! - `Io`: the request never completed (unreachable host, timeout, TLS failure)
//! - `Unauthorized`: credentials were rejected, missing, or would leak over HTTP
//! - `Remote`: the service answered with an error envelope
//! - `Protocol`: the service answered, but not in the shape the contract requires
//! - `Serialization`: a record could not be converted to or from JSON
//! - `Config`: the client itself was configured with invalid values
//!
//! None of these are retried by the client; they propagate to the caller as-is.
//!
//! # Examples
//!
//! ```rust
//! use kbmetrics_core::{Error, RemoteErrorData};
//!
//! let remote = RemoteErrorData::new(-32500, "user not found");
//! let error = Error::from(remote);
//! assert!(error.is_remote());
//! assert_eq!(error.remote_code(), Some(-32500));
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for kbmetrics operations
///
/// Used throughout the kbmetrics crates for consistent error handling.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for kbmetrics operations
///
/// Each variant corresponds to one failure class of a remote call. The
/// distinction between `Io`, `Remote` and `Protocol` matters to callers:
/// a transport failure may succeed on a later attempt, a remote error
/// carries the service's own diagnosis, and a protocol error means the
/// service broke its result contract.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Remote application error (error envelope returned by the service)
    ///
    /// Carries the server-supplied name, code, message and optional
    /// server-side trace.
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteErrorData),

    /// Connectivity or transport failure
    ///
    /// Network unreachable, DNS failure, connection reset, read timeout,
    /// TLS handshake failure, or an error while reading the response body.
    #[error("IO error: {0}")]
    Io(String),

    /// Authorization failure
    ///
    /// Raised at construction time when a token or username/password pair is
    /// rejected, and at call time when a method requires credentials that
    /// were never provided or would be sent over plain HTTP.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Result contract violation
    ///
    /// The response was not a valid envelope, lacked a result, or the result
    /// array did not contain the expected element.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization or deserialization error
    ///
    /// Occurs when converting between Rust records and JSON, e.g. a result
    /// field holding a value of the wrong type.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration
    ///
    /// Malformed endpoint URL, TLS policy that could not be built, or an
    /// unreadable response capture file.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True if the service returned an error envelope
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// True if the call failed before a response was received
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// The server-supplied error code, if this is a remote error
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            Error::Remote(data) => Some(data.code),
            _ => None,
        }
    }

    /// Short label for the error class, used as a metrics attribute
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Remote(_) => "remote",
            Error::Io(_) => "io",
            Error::Unauthorized(_) => "unauthorized",
            Error::Protocol(_) => "protocol",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// JSON-RPC 1.1 error object as returned by the service
///
/// This is the exact wire format found in the `error` member of a response
/// envelope. SDK-generated services fill it like this:
///
/// ```json
/// {"name": "JSONRPCError", "code": -32500, "message": "...", "error": "Traceback ..."}
/// ```
///
/// Every member falls back to a default, so a terse server still produces a
/// usable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteErrorData {
    /// Error class name reported by the server (e.g. "JSONRPCError")
    #[serde(default = "default_error_name")]
    pub name: String,

    /// Numeric error code
    ///
    /// Values from -32768 to -32000 are the protocol-reserved range;
    /// SDK services report application failures as -32500.
    #[serde(default)]
    pub code: i64,

    /// Human-readable error message
    #[serde(default)]
    pub message: String,

    /// Optional server-side detail, usually a stack trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

fn default_error_name() -> String {
    "JSONRPCError".to_string()
}

impl RemoteErrorData {
    /// Create a new remote error with code and message
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kbmetrics_core::RemoteErrorData;
    ///
    /// let error = RemoteErrorData::new(-32601, "Method not found");
    /// assert_eq!(error.name, "JSONRPCError");
    /// ```
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            name: default_error_name(),
            code,
            message: message.into(),
            error: None,
        }
    }

    /// Create a remote error that carries server-side detail
    pub fn with_detail(
        code: i64,
        message: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            error: Some(detail),
            ..Self::new(code, message)
        }
    }

    /// The server-side detail as text, if present
    ///
    /// SDK services send a plain traceback string; anything else is rendered
    /// as compact JSON.
    pub fn detail(&self) -> Option<String> {
        self.error.as_ref().map(|value| match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

impl std::fmt::Display for RemoteErrorData {
    /// Formats as "[code] name: message" for easy reading in logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.name, self.message)
    }
}

impl std::error::Error for RemoteErrorData {}
