//! Metrics collection through the `metrics` facade.
//!
//! # Metrics
//! - `http_front_connections_accepted_total` (counter)
//! - `http_front_connections_active` (gauge)
//! - `http_front_accept_errors_total` (counter)
//! - `http_front_requests_total` (counter): by status
//! - `http_front_request_duration_seconds` (histogram)
//! - `http_front_oversized_requests_total` (counter)
//!
//! No recorder is installed here; without one every call is a no-op.

use std::time::Instant;

use metrics::{counter, gauge, histogram};

pub fn record_connection_accepted() {
    counter!("http_front_connections_accepted_total").increment(1);
}

pub fn set_active_connections(count: u64) {
    gauge!("http_front_connections_active").set(count as f64);
}

pub fn record_accept_error() {
    counter!("http_front_accept_errors_total").increment(1);
}

pub fn record_request(status: u16, start: Instant) {
    counter!("http_front_requests_total", "status" => status.to_string()).increment(1);
    histogram!("http_front_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_oversized_request() {
    counter!("http_front_oversized_requests_total").increment(1);
}
