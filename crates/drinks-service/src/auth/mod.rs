//! Authentication and authorization for the drinks API.
//!
//! Bearer tokens are RS256 JWTs issued by the identity provider and verified
//! against its published JWKS.
//!
//! # Components
//!
//! - `guard` - Token extraction and the composed auth guard
//! - `jwks` - JWKS fetching and caching
//! - `jwt` - JWT validation using cached JWKS keys
//! - `claims` - JWT claims structure for validated tokens
//! - `permissions` - Permission enforcement on verified claims

pub mod claims;
pub mod guard;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use guard::{extract_bearer_token, requires_auth, AuthGuard};
pub use jwks::{HttpJwksFetcher, JwksClient, JwksFetcher, StaticJwksFetcher};
pub use jwt::JwtValidator;
pub use permissions::check_permissions;
