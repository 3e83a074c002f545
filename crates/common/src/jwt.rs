//! JWT utilities shared by services that verify RS256 bearer tokens.
//!
//! This module provides the parsing steps that run BEFORE any key lookup or
//! signature check:
//! - Size limits for DoS prevention
//! - Clock skew constants for iat validation
//! - Unverified header inspection (`alg` and `kid`)
//! - iat validation logic
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted at the header stage, so `none` and HMAC
//!   algorithm-confusion tokens never reach key lookup
//! - The header is untrusted input; the `kid` is used for JWKS lookup only
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_header_info, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let header = extract_header_info(token)?;
//! let jwk = jwks_client.get_key(&header.kid).await?;
//! // ... verify signature ...
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity-provider access tokens with a handful of permissions are well
/// under 2KB. Anything larger than this is rejected before base64 decoding
/// or RSA verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// The only signing algorithm accepted for bearer tokens.
pub const ACCEPTED_ALGORITHM: &str = "RS256";

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with `iat` (issued-at) timestamps more than this amount in the
/// future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting a JWT before verification.
///
/// Display strings are client-safe. Details go to debug logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Authorization malformed.")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("Authorization malformed.")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("Authorization malformed.")]
    MissingKid,

    /// Token header declares an algorithm other than RS256.
    #[error("Authorization malformed.")]
    UnsupportedAlgorithm,

    /// Token `iat` claim is too far in the future.
    #[error("Token issued in the future.")]
    IatTooFarInFuture,
}

/// The parts of an unverified JWT header that drive key selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm (always `RS256` once returned).
    pub alg: String,

    /// Key ID used to pick the verification key from the JWKS.
    pub kid: String,
}

// =============================================================================
// Functions
// =============================================================================

/// Read the `alg` and `kid` from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the signature; the token MUST still be
///   verified with the key the `kid` resolves to
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON
/// - `UnsupportedAlgorithm` - `alg` missing or not `RS256`
/// - `MissingKid` - `kid` missing, empty, or not a string
pub fn extract_header_info(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(|v| v.as_str())
        .ok_or(JwtValidationError::UnsupportedAlgorithm)?;
    if alg != ACCEPTED_ALGORITHM {
        tracing::debug!(target: "common.jwt", alg = %alg, "Token rejected: unsupported algorithm");
        return Err(JwtValidationError::UnsupportedAlgorithm);
    }

    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)?;

    Ok(TokenHeader {
        alg: alg.to_string(),
        kid,
    })
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW by config validation
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
