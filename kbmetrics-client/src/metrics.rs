//! Client metrics definitions
//!
//! OpenTelemetry instruments recorded by the caller for every remote call.
//! They are exported by whatever meter provider the application installed
//! (see `kbmetrics_core::init_observability`); with no provider they are
//! no-ops.
//!
//! # Metrics Collected
//!
//! - **requests_total**: Calls made, by method and status (counter)
//! - **request_duration**: Call latency in seconds, by method and status (histogram)
//! - **errors_total**: Failed calls, by error kind (counter)

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};
use std::fmt;

/// Instrumentation scope name used for the client's meter
pub const METER_NAME: &str = "kbmetrics-client";

/// Client metrics for monitoring
pub struct ClientMetrics {
    service: String,
    /// Total number of calls
    pub requests_total: Counter<u64>,
    /// Call duration in seconds
    pub request_duration: Histogram<f64>,
    /// Total number of failed calls
    pub errors_total: Counter<u64>,
}

impl ClientMetrics {
    /// Create metrics on the global meter provider
    ///
    /// `service_name` is attached to every measurement as `service`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::new_with_meter(&global::meter(METER_NAME), service_name)
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter, service_name: impl Into<String>) -> Self {
        Self {
            service: service_name.into(),
            requests_total: meter
                .u64_counter("kbmetrics.client.requests.total")
                .with_description("Total number of remote calls")
                .build(),
            request_duration: meter
                .f64_histogram("kbmetrics.client.request.duration")
                .with_description("Remote call duration in seconds")
                .with_unit("s")
                .build(),
            errors_total: meter
                .u64_counter("kbmetrics.client.errors.total")
                .with_description("Total number of failed remote calls")
                .build(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Record a completed call
    pub fn record_request(&self, method: &str, status: &str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("service", self.service.clone()),
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status.to_string()),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record a failed call by error kind ("io", "remote", "protocol", ...)
    pub fn record_error(&self, error_kind: &str) {
        let attributes = &[
            KeyValue::new("service", self.service.clone()),
            KeyValue::new("error_kind", error_kind.to_string()),
        ];
        self.errors_total.add(1, attributes);
    }
}

impl fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientMetrics")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = ClientMetrics::new("test-client");
        assert_eq!(metrics.service(), "test-client");

        // Without a meter provider these are no-ops and must not panic
        metrics.record_request("kb_Metrics.status", "success", 0.05);
        metrics.record_error("io");
    }

    #[test]
    fn test_request_metrics() {
        let metrics = ClientMetrics::new("test-client-req");

        metrics.record_request("kb_Metrics.get_user_details", "success", 0.05);
        metrics.record_request("kb_Metrics.get_total_logins", "success", 0.03);
        metrics.record_request("kb_Metrics.update_metrics", "error", 0.01);
        metrics.record_error("remote");
    }

    #[test]
    fn test_debug_hides_instruments() {
        let metrics = ClientMetrics::new("svc");
        assert!(format!("{:?}", metrics).contains("svc"));
    }
}
