//! Liveness endpoint.

/// Handler for GET /health
///
/// Returns "OK" while the process is serving requests. Does not check the
/// database or the identity provider.
pub async fn health_check() -> &'static str {
    "OK"
}
