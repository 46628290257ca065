//! kbmetrics - typed client for the KBase `kb_Metrics` service
//!
//! This is the convenience crate that re-exports the kbmetrics sub-crates.
//! Use it if you want a single dependency.
//!
//! # Architecture
//!
//! - **kbmetrics-core**: JSON-RPC 1.1 envelope types, codec, errors, observability
//! - **kbmetrics-client**: blocking HTTP caller, authentication, typed client
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kbmetrics::{KbMetricsClient, MetricsInputParams};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KbMetricsClient::builder("https://kbase.us/services/kb_Metrics")
//!         .token(std::env::var("KB_AUTH_TOKEN")?)
//!         .build()?;
//!
//!     let params = MetricsInputParams::new().with_epoch_range((1_600_000_000_000, 1_700_000_000_000));
//!     let logins = client.get_total_logins(&params, None)?;
//!     println!("{:?}", logins.metrics_result);
//!     Ok(())
//! }
//! ```

pub use kbmetrics_client as client;
pub use kbmetrics_core as core;

// Convenience re-exports of the most commonly used types
pub use kbmetrics_client::{
    AppMetricsParams, AppMetricsResult, ClientBuilder, EpochRange, KbMetricsClient,
    MetricsInputParams, MetricsOutput, ServiceStatus,
};
pub use kbmetrics_core::{Error, Result, RpcContext};
