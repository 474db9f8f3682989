use metrics::{counter, histogram};
use std::time::Instant;

/// Increment the counter for completed registrations (either path).
pub fn increment_registration() {
    counter!("registrations_total").increment(1);
}

/// Increment the counter for successful logins (either path).
pub fn increment_login() {
    counter!("logins_total").increment(1);
}

/// Increment the counter for rejected authentication attempts.
pub fn increment_auth_failure() {
    counter!("auth_failures_total").increment(1);
}

/// Track HTTP request latency using a histogram.
pub fn track_http_request(start: Instant) {
    let elapsed = start.elapsed();
    histogram!("http_request_duration_seconds").record(elapsed);
}
