//! Prometheus metrics for vare-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};

/// HTTP request counter by method, matched route and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vare_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// HTTP request duration histogram by method and matched route.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "vare_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register http_request_duration")
});

/// Generation calls by outcome.
pub static GENERATION_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "vare_generation_requests_total",
        "Total number of generation requests by outcome",
        &["outcome"] // success, upstream_error, parse_error
    )
    .expect("Failed to register generation_requests_total")
});

/// Generation round-trip duration.
pub static GENERATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "vare_generation_duration_seconds",
        "Generation round-trip duration in seconds",
        &["provider"],
        vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to register generation_duration")
});

/// Records persisted. Unlabelled: categories are free text.
pub static RECORDS_CREATED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "vare_records_created_total",
        "Total number of analysis records created"
    )
    .expect("Failed to register records_created_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "vare_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&GENERATION_REQUESTS_TOTAL);
    Lazy::force(&GENERATION_DURATION);
    Lazy::force(&RECORDS_CREATED_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_contains_registered_families() {
        init_metrics();
        GENERATION_REQUESTS_TOTAL
            .with_label_values(&["success"])
            .inc();

        let text = get_metrics();
        assert!(text.contains("vare_generation_requests_total"));
    }

    #[test]
    fn records_created_is_a_single_series() {
        init_metrics();
        let before = RECORDS_CREATED_TOTAL.get();
        for _ in 0..50 {
            RECORDS_CREATED_TOTAL.inc();
        }
        assert!(RECORDS_CREATED_TOTAL.get() >= before + 50.0);

        let text = get_metrics();
        let series = text
            .lines()
            .filter(|line| line.starts_with("vare_records_created_total"))
            .count();
        assert_eq!(series, 1);
        assert!(!text.contains("vare_records_created_total{"));
    }
}
