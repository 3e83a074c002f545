//! Common utilities shared across the drinks API crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, header inspection, iat validation)
pub mod jwt;
