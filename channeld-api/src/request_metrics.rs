//! Per-request counters and latency

use axum::{extract::Request, middleware::Next, response::Response};
use channeld_core::metrics::record_http_request;
use std::time::Instant;

pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    record_http_request(
        method,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    response
}
