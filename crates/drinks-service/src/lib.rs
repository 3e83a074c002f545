//! Drinks Service Library
//!
//! HTTP backend for the coffee shop drinks catalog. Reads are public;
//! writes and the detailed view require an identity-provider JWT carrying
//! the matching permission.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs (AuthGuard) -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! The auth core composes linearly:
//!
//! ```text
//! extract_bearer_token -> JwtValidator::validate -> check_permissions -> handler
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, JWKS cache, JWT validation, permissions
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission guard and HTTP metrics middleware
//! - `models` - Drink model and request/response bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - Drink persistence (PostgreSQL, in-memory)
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
