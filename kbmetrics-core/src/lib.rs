//! Core JSON-RPC 1.1 types and codec for the kb_Metrics client
//!
//! This crate provides the pieces of the client that do not depend on a
//! transport:
//!
//! - **Types**: Request, response and call-context envelopes
//! - **Codec**: Envelope encoding/decoding and the single-result contract
//! - **Error handling**: The error taxonomy returned by every client call
//! - **Observability**: `tracing` subscriber and OpenTelemetry export setup
//!
//! # Example
//!
//! ```rust
//! use kbmetrics_core::{codec, RpcRequest, RpcContext};
//! use serde_json::json;
//!
//! let ctx = RpcContext::new().with_service_version("release");
//! let request = RpcRequest::new(
//!     "kb_Metrics.get_user_details",
//!     vec![json!({"user_ids": ["alice"]})],
//!     Some(ctx),
//! );
//!
//! let body = codec::encode_request(&request).unwrap();
//! assert!(String::from_utf8(body).unwrap().contains("\"service_ver\":\"release\""));
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, RemoteErrorData, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{RpcContext, RpcRequest, RpcResponse};
