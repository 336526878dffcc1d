//! Metric definitions.
//!
//! Prometheus naming conventions: `auth_` prefix, `_total` suffix for
//! counters. Labels are bounded: `status` and `outcome` take a handful of
//! values, `topic` is bounded by the fixed topic list.

use metrics::counter;

/// Record a token pair issuance.
///
/// Metric: `auth_token_issuance_total`
/// Labels: `outcome` (success, rotated)
pub fn record_token_issuance(outcome: &str) {
    counter!("auth_token_issuance_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a token verification result.
///
/// Metric: `auth_token_validations_total`
/// Labels: `status` (success, error)
pub fn record_token_validation(status: &str) {
    counter!("auth_token_validations_total", "status" => status.to_string()).increment(1);
}

/// Record an RPC request outcome.
///
/// Metric: `auth_rpc_requests_total`
/// Labels: `topic`, `status` (success, remote_error, timeout, error, emitted)
pub fn record_rpc_request(topic: &str, status: &str) {
    counter!("auth_rpc_requests_total", "topic" => topic.to_string(), "status" => status.to_string())
        .increment(1);
}
