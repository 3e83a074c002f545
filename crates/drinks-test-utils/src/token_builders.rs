//! Builder patterns for test token payloads
//!
//! Provides a fluent API for creating identity-provider style claims.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Identity-provider domain used by test configurations.
pub const TEST_AUTH_DOMAIN: &str = "coffee-shop.test.auth0.com";

/// Audience used by test configurations.
pub const TEST_AUDIENCE: &str = "drinks";

/// Issuer matching [`TEST_AUTH_DOMAIN`].
pub fn test_issuer() -> String {
    format!("https://{TEST_AUTH_DOMAIN}/")
}

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::default()
///     .subject("auth0|barista")
///     .with_permissions(&["get:drinks-detail", "post:drinks"])
///     .expires_in(3600)
///     .build();
/// let token = TestKeypair::primary().sign(&claims);
/// ```
pub struct TestClaimsBuilder {
    iss: String,
    sub: String,
    aud: Value,
    exp: i64,
    iat: i64,
    permissions: Option<Vec<String>>,
    extra: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a builder for `issuer` and `audience` with a one hour lifetime
    /// and an empty permission list.
    pub fn new(issuer: &str, audience: &str) -> Self {
        let now = Utc::now();
        Self {
            iss: issuer.to_string(),
            sub: "auth0|test-user".to_string(),
            aud: json!(audience),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            permissions: Some(Vec::new()),
            extra: Map::new(),
        }
    }

    /// Set the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set a single audience
    pub fn audience(mut self, audience: &str) -> Self {
        self.aud = json!(audience);
        self
    }

    /// Set an audience list
    pub fn audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    /// Set the subject
    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the permissions claim
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(ToString::to_string).collect());
        self
    }

    /// Omit the permissions claim entirely (RBAC disabled at the IdP)
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Set expiration in seconds from now (negative for expired tokens)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Add a custom claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = self.extra;
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("aud".to_string(), self.aud);
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(permissions) = self.permissions {
            claims.insert("permissions".to_string(), json!(permissions));
        }
        Value::Object(claims)
    }
}

impl Default for TestClaimsBuilder {
    /// Builder for [`test_issuer`] and [`TEST_AUDIENCE`].
    fn default() -> Self {
        Self::new(&test_issuer(), TEST_AUDIENCE)
    }
}
