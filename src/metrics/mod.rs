/*!
 * # Metrics Module
 *
 * Prometheus counters for the order workflow, menu reordering and HTTP
 * traffic, exported in text format at `/metrics`.
 */

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, trace};

lazy_static! {
    pub static ref ORDER_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        "order_transitions_total",
        "Order status transitions applied, by action",
        &["action"]
    )
    .expect("metric can be created");

    pub static ref ORDER_TRANSITION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "order_transition_failures_total",
        "Rejected or failed order transitions, by reason",
        &["reason"]
    )
    .expect("metric can be created");

    pub static ref ORDERS_PLACED: IntCounter = register_int_counter!(
        "orders_placed_total",
        "Orders placed by customers"
    )
    .expect("metric can be created");

    pub static ref REORDER_BATCHES: IntCounterVec = register_int_counter_vec!(
        "reorder_batches_total",
        "Sort-order batches applied, by scope",
        &["scope"]
    )
    .expect("metric can be created");

    pub static ref OUTBOX_PUBLISHED: IntCounter = register_int_counter!(
        "outbox_events_published_total",
        "Outbox rows published to live subscribers"
    )
    .expect("metric can be created");

    static ref HTTP_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "HTTP requests by method and status",
        &["method", "status"]
    )
    .expect("metric can be created");

    static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| MetricsError::ExportError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
}

pub async fn metrics_handler() -> Response {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("metrics export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Counts requests and observes latency.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS.with_label_values(&[&method, &status]).inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method])
        .observe(started.elapsed().as_secs_f64());
    trace!(http.method = %method, http.status = %status, "recorded HTTP request");

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_export() {
        ORDER_TRANSITIONS.with_label_values(&["accept"]).inc();
        ORDERS_PLACED.inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("order_transitions_total"));
        assert!(text.contains("orders_placed_total"));
    }
}
