//! Observability for the drinks service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
