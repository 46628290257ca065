//! Parameter and result records for kb_Metrics operations
//!
//! Every record follows the same shape:
//!
//! - all declared fields are optional and omitted from the wire when unset
//! - declared fields serialize in declaration order
//! - unknown fields are kept in `additional_properties` and re-emitted
//!
//! The extension map keeps older clients working when the service adds
//! fields. No field values are validated here; the service reports invalid
//! input as a remote error.
//!
//! # Examples
//!
//! ```rust
//! use kbmetrics_client::{EpochRange, MetricsInputParams};
//!
//! let params = MetricsInputParams::new()
//!     .with_user_ids(vec!["u1".into(), "u2".into()])
//!     .with_epoch_range(EpochRange::new(1000, 2000));
//!
//! assert_eq!(
//!     serde_json::to_string(&params).unwrap(),
//!     r#"{"user_ids":["u1","u2"],"epoch_range":[1000,2000]}"#
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Output of the `status` operation
///
/// Open-ended: SDK services usually report `state`, `message`, `version`,
/// `git_url` and `git_commit_hash`, but no key is required.
pub type ServiceStatus = Map<String, Value>;

/// Closed time window in Unix epoch milliseconds
///
/// Serialized as the two-element array `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRange(pub i64, pub i64);

impl EpochRange {
    pub fn new(lower: i64, upper: i64) -> Self {
        Self(lower, upper)
    }

    pub fn lower(&self) -> i64 {
        self.0
    }

    pub fn upper(&self) -> i64 {
        self.1
    }
}

impl From<(i64, i64)> for EpochRange {
    fn from((lower, upper): (i64, i64)) -> Self {
        Self(lower, upper)
    }
}

impl fmt::Display for EpochRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0, self.1)
    }
}

/// Shared extension-map accessors and `Display` for a record type
macro_rules! extensible_record {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl $name {
            /// Unrecognized fields, preserved for re-serialization
            pub fn additional_properties(&self) -> &Map<String, Value> {
                &self.additional_properties
            }

            /// Add or replace an extension field
            pub fn set_additional_property(&mut self, name: impl Into<String>, value: Value) {
                self.additional_properties.insert(name.into(), value);
            }

            /// Builder form of [`Self::set_additional_property`]
            pub fn with_additional_property(mut self, name: impl Into<String>, value: Value) -> Self {
                self.set_additional_property(name, value);
                self
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} [", stringify!($name))?;
                $(
                    write!(f, "{}={}, ", stringify!($field), DisplayOpt(&self.$field))?;
                )*
                write!(f, "additional_properties={}]", Value::Object(self.additional_properties.clone()))
            }
        }
    };
}

struct DisplayOpt<'a, T>(&'a Option<T>);

impl<T: fmt::Debug> fmt::Display for DisplayOpt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:?}", value),
            None => f.write_str("null"),
        }
    }
}

/// Parameters of `get_app_metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppMetricsParams {
    /// Users whose jobs to report; the service defaults to the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_range: Option<EpochRange>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl AppMetricsParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_ids(mut self, user_ids: Vec<String>) -> Self {
        self.user_ids = Some(user_ids);
        self
    }

    pub fn with_epoch_range(mut self, epoch_range: impl Into<EpochRange>) -> Self {
        self.epoch_range = Some(epoch_range.into());
        self
    }
}

extensible_record!(AppMetricsParams { user_ids, epoch_range });

/// Result of `get_app_metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppMetricsResult {
    /// Job state documents, uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_states: Option<Value>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl AppMetricsResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_states(mut self, job_states: Value) -> Self {
        self.job_states = Some(job_states);
        self
    }
}

extensible_record!(AppMetricsResult { job_states });

/// Unified parameters of the metrics update and query operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsInputParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_range: Option<EpochRange>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl MetricsInputParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_ids(mut self, user_ids: Vec<String>) -> Self {
        self.user_ids = Some(user_ids);
        self
    }

    pub fn with_epoch_range(mut self, epoch_range: impl Into<EpochRange>) -> Self {
        self.epoch_range = Some(epoch_range.into());
        self
    }
}

extensible_record!(MetricsInputParams { user_ids, epoch_range });

/// Unified result of the metrics update and query operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsOutput {
    /// Metrics document, uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_result: Option<Value>,

    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl MetricsOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics_result(mut self, metrics_result: Value) -> Self {
        self.metrics_result = Some(metrics_result);
        self
    }
}

extensible_record!(MetricsOutput { metrics_result });
