//! Typed blocking client for the kb_Metrics JSON-RPC service
//!
//! This crate provides a client for the kb_Metrics service, which reports
//! usage metrics (app runs, logins, sign-ups, narrative and workspace
//! statistics) of a KBase deployment. It includes:
//!
//! - **Models**: Parameter and result records with forward-compatible
//!   extension maps
//! - **Client**: One typed method per remote operation, plus `status`
//! - **Caller**: Blocking JSON-RPC 1.1 transport over HTTP(S) with timeout,
//!   TLS trust, insecure-HTTP and streaming settings
//! - **Auth**: Token validation and login at construction time
//! - **Metrics**: OpenTelemetry call counters and latency histograms
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kbmetrics_client::{ClientBuilder, EpochRange, MetricsInputParams};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new("https://kbase.us/services/kb_Metrics")
//!         .token(std::env::var("KB_AUTH_TOKEN")?)
//!         .build()?;
//!
//!     let params = MetricsInputParams::new()
//!         .with_user_ids(vec!["alice".into()])
//!         .with_epoch_range(EpochRange::new(1_514_764_800_000, 1_517_443_200_000));
//!
//!     let logins = client.get_user_logins(&params, None)?;
//!     println!("{}", logins);
//!     Ok(())
//! }
//! ```

mod auth;
mod caller;
mod client;
mod client_builder;
mod metrics;
mod models;
mod tls;

pub use auth::{AuthProvider, AuthToken, HttpAuthProvider, DEFAULT_AUTH_URL};
pub use caller::{JsonClientCaller, DEFAULT_READ_TIMEOUT};
pub use client::{KbMetricsClient, SERVICE_NAME};
pub use client_builder::{ClientBuilder, ENV_AUTH_TOKEN, ENV_AUTH_URL, ENV_SERVICE_URL};
pub use metrics::ClientMetrics;
pub use models::{
    AppMetricsParams, AppMetricsResult, EpochRange, MetricsInputParams, MetricsOutput,
    ServiceStatus,
};
