//! Guard composing token extraction, JWT verification and permission
//! enforcement around a protected action.
//!
//! ```text
//! Authorization header -> extract_bearer_token -> JwtValidator::validate
//!                      -> check_permissions -> action(claims)
//! ```
//!
//! The first failing stage short-circuits with its [`AuthError`]; the action
//! is never invoked on failure.

use crate::auth::claims::Claims;
use crate::auth::jwt::JwtValidator;
use crate::auth::permissions::check_permissions;
use crate::errors::AuthError;
use crate::observability::metrics::record_auth_failure;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Description for a missing or malformed `Authorization` header.
pub const INVALID_HEADER: &str = "Invalid header";

/// Extract the bearer token from the `Authorization` header.
///
/// The header must be exactly two whitespace-separated parts, the first of
/// which is `bearer` (any case). The second part is returned unchanged.
///
/// # Errors
///
/// `AuthError::InvalidHeader` if the header is absent, not visible ASCII,
/// or not of the form `Bearer <token>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let invalid = || AuthError::InvalidHeader(INVALID_HEADER.to_string());

    let value = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "drinks.auth.guard", "Missing Authorization header");
        invalid()
    })?;

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "drinks.auth.guard", "Authorization header is not visible ASCII");
        invalid()
    })?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => {
            tracing::debug!(target: "drinks.auth.guard", "Invalid Authorization header format");
            Err(invalid())
        }
    }
}

/// Reusable authorization guard for one required permission.
///
/// An empty permission only requires a valid token.
pub struct AuthGuard {
    validator: Arc<JwtValidator>,
    permission: String,
}

/// Build a guard that requires `permission`.
pub fn requires_auth(validator: Arc<JwtValidator>, permission: impl Into<String>) -> AuthGuard {
    AuthGuard {
        validator,
        permission: permission.into(),
    }
}

impl AuthGuard {
    pub fn permission(&self) -> &str {
        &self.permission
    }

    /// Run extraction, verification and enforcement, returning the claims.
    ///
    /// Failures are counted by error code before being returned.
    #[instrument(skip_all, name = "drinks.auth.guard", fields(permission = %self.permission))]
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let result = self.authorize_inner(headers).await;
        if let Err(e) = &result {
            record_auth_failure(e.code());
            tracing::debug!(
                target: "drinks.auth.guard",
                code = e.code(),
                status = e.status_code(),
                "Authorization failed"
            );
        }
        result
    }

    async fn authorize_inner(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.validator.validate(token).await?;
        check_permissions(&self.permission, &claims)?;
        Ok(claims)
    }

    /// Authorize, then invoke `action` with the claims.
    ///
    /// `action` is not called when authorization fails.
    pub async fn call<F, Fut, T>(&self, headers: &HeaderMap, action: F) -> Result<T, AuthError>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(headers).await?;
        Ok(action(claims).await)
    }
}
