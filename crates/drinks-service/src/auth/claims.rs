//! JWT claims structure.
//!
//! Contains the claims extracted from validated identity-provider tokens.
//! The `sub` field is redacted in Debug output to keep user identifiers out
//! of logs.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The `aud` claim: a single audience or a list of audiences.
///
/// Auth0 issues a list when the token is also valid for the userinfo
/// endpoint, and a plain string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `audience` is one of the token's audiences.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == audience,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == audience),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice = match self {
            Audience::Single(aud) => std::slice::from_ref(aud),
            Audience::Multiple(auds) => auds.as_slice(),
        };
        slice.iter().map(String::as_str)
    }
}

impl Default for Audience {
    fn default() -> Self {
        Audience::Multiple(Vec::new())
    }
}

/// Decoded and validated token payload.
///
/// Registered claims default when absent so that presence checks are done
/// by claim validation (`exp`, `aud`, `iss` are required there) rather than
/// surfacing as a parse failure.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (`https://{auth-domain}/`).
    #[serde(default)]
    pub iss: String,

    /// Subject (user id) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Audience(s) the token was issued for.
    #[serde(default)]
    pub aud: Audience,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: i64,

    /// RBAC permissions granted to this token.
    ///
    /// `None` means the claim is absent (RBAC not enabled at the identity
    /// provider), which is distinct from an empty permission list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,

    /// Any other claims present in the token (`azp`, `scope`, custom claims).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// RFC 7519 NumericDate: integer or fractional seconds, truncated to whole
/// seconds.
fn numeric_date<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumericDate {
        Whole(i64),
        Fractional(f64),
    }

    match NumericDate::deserialize(deserializer)? {
        NumericDate::Whole(secs) => Ok(secs),
        NumericDate::Fractional(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        NumericDate::Fractional(_) => Err(de::Error::custom("NumericDate must be finite")),
    }
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("permissions", &self.permissions)
            .field("extra_claims", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Claims {
    /// Check if the token grants a specific permission (exact match).
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_some_and(|permissions| permissions.contains(permission))
    }

    /// Look up a non-registered claim by name.
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}
