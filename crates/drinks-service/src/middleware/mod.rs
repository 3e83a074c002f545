//! Middleware for the drinks service.
//!
//! # Components
//!
//! - `auth` - Per-route permission guard
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
