//! Error types for the drinks service.
//!
//! `AuthError` is the failure type of the auth core (extractor, verifier,
//! enforcer). `ApiError` is the handler-level error that wraps it and maps
//! every failure to an HTTP response of the form:
//!
//! ```json
//! { "success": false, "error": 401, "message": "Token expired." }
//! ```
//!
//! Database details are logged server-side and never returned to clients.

use crate::repositories::RepositoryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authentication/authorization failure.
///
/// Each variant carries a stable machine-readable `code()` and an HTTP
/// `status_code()`; the Display string is the human-readable description.
///
/// | variant | code | status |
/// |---|---|---|
/// | `InvalidHeader` | `invalid_header` | 401 |
/// | `TokenExpired` | `token_expired` | 401 |
/// | `InvalidClaims` | `invalid_claims` | 401 |
/// | `PermissionsMissing` | `invalid_claims` | 400 |
/// | `Unauthorized` | `unauthorized` | 403 |
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing/malformed header, malformed token, bad signature, unknown key,
    /// or identity provider unreachable.
    #[error("{0}")]
    InvalidHeader(String),

    #[error("Token expired.")]
    TokenExpired,

    /// Audience, issuer or issued-at mismatch.
    #[error("{0}")]
    InvalidClaims(String),

    /// The token verified but carries no `permissions` claim. This points at
    /// identity-provider configuration (RBAC disabled), not at the caller.
    #[error("Permissions not included in JWT.")]
    PermissionsMissing,

    /// Required permission absent from the token.
    #[error("{0}")]
    Unauthorized(String),
}

impl AuthError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims(_) | AuthError::PermissionsMissing => "invalid_claims",
            AuthError::Unauthorized(_) => "unauthorized",
        }
    }

    /// HTTP status code for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidHeader(_)
            | AuthError::TokenExpired
            | AuthError::InvalidClaims(_) => 401,
            AuthError::PermissionsMissing => 400,
            AuthError::Unauthorized(_) => 403,
        }
    }

    /// Human-readable description (same as Display).
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Handler-level error type.
///
/// Maps to HTTP status codes:
/// - Auth: status of the wrapped `AuthError`
/// - BadRequest: 400
/// - NotFound: 404
/// - Unprocessable: 422
/// - Database, Internal: 500
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Unprocessable(_) => 422,
            ApiError::Database(_) | ApiError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let message = match &self {
            ApiError::Auth(err) => err.description(),
            ApiError::BadRequest(reason)
            | ApiError::NotFound(reason)
            | ApiError::Unprocessable(reason) => reason.clone(),
            ApiError::Database(err) => {
                tracing::error!(target: "drinks.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            ApiError::Internal => "An internal error occurred".to_string(),
        };

        let status =
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"drinks-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::Auth(self).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ApiError::NotFound(format!("Drink {id} not found")),
            RepositoryError::DuplicateTitle(title) => {
                ApiError::Unprocessable(format!("A drink titled '{title}' already exists"))
            }
            RepositoryError::Database(err) => ApiError::Database(err),
        }
    }
}
