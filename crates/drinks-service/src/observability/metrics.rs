//! Metrics definitions for the drinks service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `drinks_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 6 values (parameterized paths, unknown paths become `/other`)
//! - `status`: 3 values (success, error, timeout)
//! - `code`: bounded by `AuthError::code()`
//! - `operation`: bounded by repository methods

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded; recording without a
/// recorder is a no-op.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetches are bounded by the fetch timeout (max 30s)
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS refresh buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("drinks_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `drinks_http_requests_total`, `drinks_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 400 (JSON parse errors), 404 and 405.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("drinks_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
///
/// Replaces drink ids with `{id}`.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/drinks" | "/drinks-detail" => path.to_string(),
        _ => match path.strip_prefix("/drinks/") {
            Some(id) if !id.is_empty() && !id.contains('/') => "/drinks/{id}".to_string(),
            _ => "/other".to_string(),
        },
    }
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `drinks_db_query_duration_seconds`, `drinks_db_queries_total`
/// Labels: `operation`, `status`
///
/// Operations: list_drinks, get_drink, insert_drink, update_drink, delete_drink
pub fn record_db_query(operation: &str, status: &str, duration: Duration) {
    histogram!("drinks_db_query_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_db_queries_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Record a rejected request.
///
/// Metric: `drinks_auth_failures_total`
/// Labels: `code` (`invalid_header`, `token_expired`, `invalid_claims`, `unauthorized`)
pub fn record_auth_failure(code: &str) {
    counter!("drinks_auth_failures_total",
        "code" => code.to_string()
    )
    .increment(1);
}

/// Record a JWKS refresh attempt.
///
/// Metric: `drinks_jwks_refresh_total`, `drinks_jwks_refresh_duration_seconds`
/// Labels: `status` (`success`, `error`)
pub fn record_jwks_refresh(status: &str, duration: Duration) {
    histogram!("drinks_jwks_refresh_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("drinks_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}
