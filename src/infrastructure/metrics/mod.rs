//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Appointments created and status transitions
//! - Wompi webhook outcomes
//! - Geocoding lookups by source (cache or upstream)

use once_cell::sync::Lazy;
use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

const NAMESPACE: &str = "turnoya";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("static metric definition")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("static metric definition")
});

pub static APPOINTMENTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("appointments_created_total", "Appointments booked").namespace(NAMESPACE),
    )
    .expect("static metric definition")
});

/// Status transitions by target status
pub static APPOINTMENT_STATUS_CHANGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "appointment_status_changes_total",
            "Appointment status transitions",
        )
        .namespace(NAMESPACE),
        &["status"],
    )
    .expect("static metric definition")
});

/// Webhook deliveries by outcome: applied, unknown_reference, invalid_signature
pub static PAYMENT_WEBHOOKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("payment_webhooks_total", "Wompi webhook deliveries").namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("static metric definition")
});

/// City lookups by source: cache or nominatim
pub static GEOCODING_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("geocoding_requests_total", "City autocomplete lookups").namespace(NAMESPACE),
        &["source"],
    )
    .expect("static metric definition")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(APPOINTMENTS_CREATED_TOTAL.clone()),
        Box::new(APPOINTMENT_STATUS_CHANGES_TOTAL.clone()),
        Box::new(PAYMENT_WEBHOOKS_TOTAL.clone()),
        Box::new(GEOCODING_REQUESTS_TOTAL.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!(error = %e, "Failed to register metric");
        }
    }
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn record_appointment_created() {
    APPOINTMENTS_CREATED_TOTAL.inc();
}

pub fn record_status_change(status: &str) {
    APPOINTMENT_STATUS_CHANGES_TOTAL
        .with_label_values(&[status])
        .inc();
}

pub fn record_payment_webhook(outcome: &str) {
    PAYMENT_WEBHOOKS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_geocoding(source: &str) {
    GEOCODING_REQUESTS_TOTAL.with_label_values(&[source]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = &*REGISTRY;
        let _ = &*APPOINTMENTS_CREATED_TOTAL;
        let _ = &*PAYMENT_WEBHOOKS_TOTAL;
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        let metrics = gather_metrics();
        assert!(metrics.contains("turnoya_http_requests_total"));
    }

    #[test]
    fn test_domain_counters_are_exported() {
        record_appointment_created();
        record_status_change("Confirmed");
        record_payment_webhook("applied");
        record_geocoding("cache");

        let metrics = gather_metrics();
        assert!(metrics.contains("turnoya_appointments_created_total"));
        assert!(metrics.contains("turnoya_appointment_status_changes_total{status=\"Confirmed\"}"));
        assert!(metrics.contains("turnoya_payment_webhooks_total{outcome=\"applied\"}"));
        assert!(metrics.contains("turnoya_geocoding_requests_total{source=\"cache\"}"));
    }
}
