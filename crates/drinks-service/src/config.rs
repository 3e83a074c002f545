//! Drinks service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use common::jwt::{ACCEPTED_ALGORITHM, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS cache TTL in seconds (5 minutes).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the JWKS fetch timeout. Requests wait on this fetch.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 30;

/// Drinks service configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity-provider domain (e.g. `coffee-shop.eu.auth0.com`).
    pub auth_domain: String,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// Accepted signing algorithms. Validated to be exactly `["RS256"]`.
    pub algorithms: Vec<String>,

    /// JWKS endpoint. Defaults to `https://{auth_domain}/.well-known/jwks.json`.
    pub jwks_url: String,

    /// How long fetched keys are trusted before a refresh.
    pub jwks_cache_ttl_seconds: u64,

    /// Read timeout for the JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Clock skew tolerance in seconds for `iat` validation.
    pub jwt_clock_skew_seconds: i64,

    /// PostgreSQL connection URL. `None` selects the in-memory repository.
    pub database_url: Option<String>,

    /// Server bind address.
    pub bind_address: String,
}

impl Config {
    /// Issuer every accepted token must carry: `https://{auth_domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_domain", &self.auth_domain)
            .field("api_audience", &self.api_audience)
            .field("algorithms", &self.algorithms)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwks_fetch_timeout_seconds", &self.jwks_fetch_timeout_seconds)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid auth domain: {0}")]
    InvalidAuthDomain(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_domain = required(vars, "AUTH0_DOMAIN")?;
        if auth_domain.contains("://") || auth_domain.contains('/') {
            return Err(ConfigError::InvalidAuthDomain(format!(
                "AUTH0_DOMAIN must be a bare host name, got '{}'",
                auth_domain
            )));
        }

        let api_audience = required(vars, "API_AUDIENCE")?;

        let algorithms: Vec<String> = vars
            .get("AUTH_ALGORITHMS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|alg| !alg.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![ACCEPTED_ALGORITHM.to_string()]);

        if algorithms.is_empty() || algorithms.iter().any(|alg| alg != ACCEPTED_ALGORITHM) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "AUTH_ALGORITHMS must be exactly {}, got {:?}",
                ACCEPTED_ALGORITHM, algorithms
            )));
        }

        let jwks_url = vars
            .get("AUTH_JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));

        let jwks_cache_ttl_seconds = parse_u64(
            vars,
            "JWKS_CACHE_TTL_SECONDS",
            DEFAULT_JWKS_CACHE_TTL_SECONDS,
        )?;
        if jwks_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidJwks(
                "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let jwks_fetch_timeout_seconds = parse_u64(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS,
        )?;
        if jwks_fetch_timeout_seconds == 0
            || jwks_fetch_timeout_seconds > MAX_JWKS_FETCH_TIMEOUT_SECONDS
        {
            return Err(ConfigError::InvalidJwks(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                MAX_JWKS_FETCH_TIMEOUT_SECONDS, jwks_fetch_timeout_seconds
            )));
        }

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .cloned();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Config {
            auth_domain,
            api_audience,
            algorithms,
            jwks_url,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            jwt_clock_skew_seconds,
            database_url,
            bind_address,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| {
            ConfigError::InvalidJwks(format!(
                "{} must be a valid positive integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}
