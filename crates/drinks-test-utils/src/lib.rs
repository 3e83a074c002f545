//! # Drinks Test Utilities
//!
//! Shared test utilities for the drinks service.
//!
//! This crate provides:
//! - Fixed RSA key pairs and RS256 token signing (`rsa_fixtures`)
//! - Claims builders (`token_builders`)
//! - Mock JWKS endpoint helpers (`jwks_mock`)
//! - Server test harness (`TestDrinksServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drinks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestDrinksServer::spawn().await?;
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/drinks", server.url()))
//!         .bearer_auth(server.token(&["post:drinks"]))
//!         .json(&serde_json::json!({
//!             "title": "Water",
//!             "recipe": {"name": "Water", "color": "blue", "parts": 1}
//!         }))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod jwks_mock;
pub mod rsa_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use jwks_mock::*;
pub use rsa_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
