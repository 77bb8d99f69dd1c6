//! Metric names and recording helpers
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};

pub const STORE_OPERATIONS: &str = "channel.store.operations";
pub const HTTP_REQUESTS: &str = "http.requests.total";
pub const HTTP_REQUEST_DURATION: &str = "http.request.duration_ms";

/// Register descriptions for every metric channeld emits
pub fn init_metrics() {
    describe_counter!(STORE_OPERATIONS, "Channel store operations by kind");
    describe_counter!(HTTP_REQUESTS, "HTTP requests by method and status");
    describe_histogram!(HTTP_REQUEST_DURATION, "HTTP request duration in milliseconds");
}

/// Count one store operation
pub fn record_store_op(op: &'static str) {
    counter!(STORE_OPERATIONS, "op" => op).increment(1);
}

/// Count one finished HTTP request and its latency
pub fn record_http_request(method: String, status: u16, duration_ms: f64) {
    counter!(HTTP_REQUESTS, "method" => method, "status" => status.to_string()).increment(1);
    histogram!(HTTP_REQUEST_DURATION).record(duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        init_metrics();
        record_store_op("create_channel");
        record_http_request("GET".to_string(), 200, 1.5);
    }
}
