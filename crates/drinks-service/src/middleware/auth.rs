//! Permission middleware for protected routes.
//!
//! Runs an [`AuthGuard`] against the request headers and injects the
//! verified claims into request extensions. Handlers receive them with
//! `Extension<Claims>`.

use crate::auth::{AuthGuard, Claims};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Middleware that enforces the guard's permission.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - 401 with `WWW-Authenticate` for missing/invalid/expired tokens
/// - 400 when the token carries no permissions claim
/// - 403 when the permission is not granted
/// - Otherwise continues to the handler with claims in extensions
#[instrument(skip_all, name = "drinks.middleware.auth")]
pub async fn require_permission(
    State(guard): State<Arc<AuthGuard>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let claims = guard.authorize(req.headers()).await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extension trait for extracting claims from request.
pub trait ClaimsExt {
    /// Get the authenticated claims from request extensions.
    ///
    /// Returns `None` if the permission middleware was not applied.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}
