//! JWT validation against the identity provider's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - Only RS256 is accepted, both in the header check and in verification
//! - Signature is verified before any claim is trusted
//! - `exp`, `aud` and `iss` are required; `iat` is checked against clock skew

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient, KEY_NOT_FOUND};
use crate::config::Config;
use crate::errors::AuthError;
use common::jwt::{extract_header_info, validate_iat, ACCEPTED_ALGORITHM};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Description for audience/issuer mismatches and missing registered claims.
pub const INCORRECT_CLAIMS: &str = "Incorrect claims. Please, check the audience and issuer.";

/// Description for tokens whose signature or payload cannot be verified.
pub const UNPARSEABLE_TOKEN: &str = "Unable to parse authentication token.";

/// JWT validator using keys from a [`JwksClient`].
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,

    /// Expected `aud`.
    audience: String,

    /// Expected `iss`, `https://{auth-domain}/`.
    issuer: String,

    /// Clock skew tolerance for iat validation.
    clock_skew: Duration,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Shared key cache
    /// * `audience` - Value the `aud` claim must contain
    /// * `issuer` - Value the `iss` claim must equal
    /// * `clock_skew_seconds` - Tolerance for `iat` in the future
    pub fn new(
        jwks_client: Arc<JwksClient>,
        audience: String,
        issuer: String,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            jwks_client,
            audience,
            issuer,
            clock_skew: Duration::from_secs(clock_skew_seconds.max(0).unsigned_abs()),
        }
    }

    /// Build a validator for the audience and issuer in `config`.
    pub fn from_config(config: &Config, jwks_client: Arc<JwksClient>) -> Self {
        Self::new(
            jwks_client,
            config.api_audience.clone(),
            config.issuer(),
            config.jwt_clock_skew_seconds,
        )
    }

    /// Validate a JWT and return the claims.
    ///
    /// 1. Size check, then read `alg`/`kid` from the unverified header
    /// 2. Resolve the signing key (JWKS cache, one refresh on miss)
    /// 3. Verify RS256 signature
    /// 4. Validate `exp`, `aud`, `iss`
    /// 5. Validate `iat` with clock skew tolerance
    ///
    /// # Errors
    ///
    /// - `InvalidHeader` - malformed token, bad signature, unknown key
    /// - `TokenExpired` - `exp` elapsed
    /// - `InvalidClaims` - audience/issuer mismatch, missing registered
    ///   claims, `iat` in the future
    #[instrument(skip_all, name = "drinks.auth.jwt.validate")]
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let header = extract_header_info(token).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = ?e, "Token header rejected");
            AuthError::InvalidHeader(e.to_string())
        })?;

        let jwk = self.jwks_client.get_key(&header.kid).await?;

        let claims = verify_token(token, &jwk, &self.audience, &self.issuer)?;

        if let Err(e) = validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "drinks.auth.jwt", error = ?e, "Token iat validation failed");
            return Err(AuthError::InvalidClaims(e.to_string()));
        }

        tracing::debug!(target: "drinks.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

/// Build the RSA decoding key for a JWK.
///
/// Rejects keys that are not RSA signing keys for RS256.
fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    let key_not_found = || AuthError::InvalidHeader(KEY_NOT_FOUND.to_string());

    if jwk.kty != "RSA" {
        tracing::warn!(target: "drinks.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(key_not_found());
    }
    if let Some(alg) = &jwk.alg {
        if alg != ACCEPTED_ALGORITHM {
            tracing::warn!(target: "drinks.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(key_not_found());
        }
    }
    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "drinks.auth.jwt", key_use = %key_use, "JWK is not a signing key");
            return Err(key_not_found());
        }
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "drinks.auth.jwt", kid = %jwk.kid, "JWK missing RSA components");
        return Err(key_not_found());
    };

    DecodingKey::from_rsa_components(n, e).map_err(|e| {
        tracing::error!(target: "drinks.auth.jwt", error = %e, "Invalid RSA key encoding");
        key_not_found()
    })
}

/// Verify the RS256 signature and registered claims, returning the payload.
fn verify_token(
    token: &str,
    jwk: &Jwk,
    audience: &str,
    issuer: &str,
) -> Result<Claims, AuthError> {
    let decoding_key = decoding_key(jwk)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_audience(&[audience]);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "aud", "iss"]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "drinks.auth.jwt", error = %e, "Token verification failed");
        map_verification_error(e.kind())
    })?;

    Ok(token_data.claims)
}

fn map_verification_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::MissingRequiredClaim(_) => {
            AuthError::InvalidClaims(INCORRECT_CLAIMS.to_string())
        }
        _ => AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::{JwksResponse, StaticJwksFetcher};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use drinks_test_utils::rsa_fixtures::TestKeypair;
    use drinks_test_utils::token_builders::TestClaimsBuilder;
    use serde_json::json;

    const ISSUER: &str = "https://coffee.test.auth0.com/";
    const AUDIENCE: &str = "drinks";

    fn jwk_of(keypair: &TestKeypair) -> Jwk {
        serde_json::from_value(keypair.jwk_json()).unwrap()
    }

    fn validator_with(keys: Vec<Jwk>) -> JwtValidator {
        let fetcher = Arc::new(StaticJwksFetcher::new(JwksResponse { keys }));
        JwtValidator::new(
            Arc::new(JwksClient::new(fetcher)),
            AUDIENCE.to_string(),
            ISSUER.to_string(),
            300,
        )
    }

    fn claims() -> TestClaimsBuilder {
        TestClaimsBuilder::new(ISSUER, AUDIENCE)
    }

    // =========================================================================
    // decoding_key
    // =========================================================================

    #[test]
    fn test_decoding_key_rejects_non_rsa_key_type() {
        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.kty = "OKP".to_string();

        assert_eq!(
            decoding_key(&jwk).err(),
            Some(AuthError::InvalidHeader(KEY_NOT_FOUND.to_string()))
        );
    }

    #[test]
    fn test_decoding_key_rejects_other_algorithm_and_use() {
        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.alg = Some("RS512".to_string());
        assert!(decoding_key(&jwk).is_err());

        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.key_use = Some("enc".to_string());
        assert!(decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_rejects_missing_components() {
        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.n = None;
        assert!(decoding_key(&jwk).is_err());

        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.e = None;
        assert!(decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_accepts_jwk_without_alg_and_use() {
        let mut jwk = jwk_of(&TestKeypair::primary());
        jwk.alg = None;
        jwk.key_use = None;
        assert!(decoding_key(&jwk).is_ok());
    }

    // =========================================================================
    // verify_token
    // =========================================================================

    #[test]
    fn test_verify_token_valid() {
        let keypair = TestKeypair::primary();
        let token = keypair.sign(&claims().with_permissions(&["get:drinks-detail"]).build());

        let claims = verify_token(&token, &jwk_of(&keypair), AUDIENCE, ISSUER).unwrap();

        assert_eq!(claims.iss, ISSUER);
        assert!(claims.aud.contains(AUDIENCE));
        assert!(claims.has_permission("get:drinks-detail"));
    }

    #[test]
    fn test_verify_token_expired() {
        let keypair = TestKeypair::primary();
        let token = keypair.sign(&claims().expires_in(-3600).build());

        assert_eq!(
            verify_token(&token, &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
            Some(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_verify_token_wrong_audience_and_issuer() {
        let keypair = TestKeypair::primary();
        let expected = Some(AuthError::InvalidClaims(INCORRECT_CLAIMS.to_string()));

        let token = keypair.sign(&claims().audience("image").build());
        assert_eq!(
            verify_token(&token, &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
            expected
        );

        let token = keypair.sign(&claims().issuer("https://evil.auth0.com/").build());
        assert_eq!(
            verify_token(&token, &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
            expected
        );
    }

    #[test]
    fn test_verify_token_missing_registered_claims() {
        let keypair = TestKeypair::primary();
        for claim in ["aud", "iss", "exp"] {
            let mut payload = claims().build();
            payload.as_object_mut().unwrap().remove(claim);
            let token = keypair.sign(&payload);

            assert_eq!(
                verify_token(&token, &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
                Some(AuthError::InvalidClaims(INCORRECT_CLAIMS.to_string())),
                "missing {claim} should be invalid_claims"
            );
        }
    }

    #[test]
    fn test_verify_token_signed_by_other_key() {
        let token = TestKeypair::secondary()
            .sign_with_kid(&claims().build(), TestKeypair::PRIMARY_KID);

        assert_eq!(
            verify_token(&token, &jwk_of(&TestKeypair::primary()), AUDIENCE, ISSUER).err(),
            Some(AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string()))
        );
    }

    #[test]
    fn test_verify_token_bad_signature_checked_before_expiry() {
        let token = TestKeypair::secondary()
            .sign_with_kid(&claims().expires_in(-60).build(), TestKeypair::PRIMARY_KID);

        assert_eq!(
            verify_token(&token, &jwk_of(&TestKeypair::primary()), AUDIENCE, ISSUER).err(),
            Some(AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string()))
        );
    }

    #[test]
    fn test_verify_token_fractional_exp() {
        let keypair = TestKeypair::primary();
        let now = chrono::Utc::now().timestamp();

        let mut payload = claims().build();
        payload["exp"] = json!(now as f64 + 3600.5);
        let verified = verify_token(&keypair.sign(&payload), &jwk_of(&keypair), AUDIENCE, ISSUER)
            .unwrap();
        assert_eq!(verified.exp, now + 3600);

        let mut payload = claims().build();
        payload["exp"] = json!(now as f64 - 60.5);
        assert_eq!(
            verify_token(&keypair.sign(&payload), &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
            Some(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_verify_token_tampered_payload() {
        let keypair = TestKeypair::primary();
        let token = keypair.sign(&claims().with_permissions(&["get:drinks-detail"]).build());

        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims().with_permissions(&["delete:drinks"]).build()).unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(
            verify_token(&forged, &jwk_of(&keypair), AUDIENCE, ISSUER).err(),
            Some(AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string()))
        );
    }

    #[test]
    fn test_map_verification_error() {
        assert_eq!(
            map_verification_error(&ErrorKind::ExpiredSignature),
            AuthError::TokenExpired
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidAudience).code(),
            "invalid_claims"
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidIssuer).code(),
            "invalid_claims"
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidSignature).code(),
            "invalid_header"
        );
        assert_eq!(
            map_verification_error(&ErrorKind::InvalidAlgorithm).code(),
            "invalid_header"
        );
    }

    // =========================================================================
    // JwtValidator
    // =========================================================================

    #[tokio::test]
    async fn test_validate_round_trip() {
        let keypair = TestKeypair::primary();
        let validator = validator_with(vec![jwk_of(&keypair)]);
        let token = keypair.sign(
            &claims()
                .with_permissions(&["post:drinks", "get:drinks-detail", "patch:drinks"])
                .with_claim("azp", json!("coffee-shop-frontend"))
                .build(),
        );

        let claims = validator.validate(&token).await.unwrap();

        let permissions: Vec<&str> = claims
            .permissions
            .as_ref()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(permissions, vec!["get:drinks-detail", "patch:drinks", "post:drinks"]);
        assert_eq!(claims.claim("azp"), Some(&json!("coffee-shop-frontend")));
    }

    #[tokio::test]
    async fn test_validate_is_idempotent() {
        let keypair = TestKeypair::primary();
        let validator = validator_with(vec![jwk_of(&keypair)]);
        let token = keypair.sign(&claims().with_permissions(&["get:drinks-detail"]).build());

        let first = validator.validate(&token).await.unwrap();
        let second = validator.validate(&token).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_validate_unknown_kid() {
        let validator = validator_with(vec![jwk_of(&TestKeypair::secondary())]);
        let token = TestKeypair::primary().sign(&claims().build());

        assert_eq!(
            validator.validate(&token).await.err(),
            Some(AuthError::InvalidHeader(KEY_NOT_FOUND.to_string()))
        );
    }

    #[tokio::test]
    async fn test_validate_missing_kid() {
        let keypair = TestKeypair::primary();
        let validator = validator_with(vec![jwk_of(&keypair)]);
        let token = keypair.sign_without_kid(&claims().build());

        let err = validator.validate(&token).await.unwrap_err();
        assert_eq!(err.code(), "invalid_header");
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_validate_rejects_future_iat() {
        let keypair = TestKeypair::primary();
        let validator = validator_with(vec![jwk_of(&keypair)]);
        let now = chrono::Utc::now().timestamp();
        let token = keypair.sign(&claims().issued_at(now + 3600).expires_in(7200).build());

        let err = validator.validate(&token).await.unwrap_err();
        assert_eq!(err.code(), "invalid_claims");
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_validate_rejects_malformed_and_oversized() {
        let validator = validator_with(vec![jwk_of(&TestKeypair::primary())]);

        for token in ["not.a.valid.jwt", "abc", "", &"a".repeat(9000)] {
            let err = validator.validate(token).await.unwrap_err();
            assert_eq!(err.code(), "invalid_header", "token of len {}", token.len());
        }
    }
}
