//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! Keys come from `https://{auth-domain}/.well-known/jwks.json` through a
//! [`JwksFetcher`]. The cache is a process-wide, injectable [`JwksClient`]:
//!
//! - starts empty and is populated on the first lookup,
//! - trusts fetched keys for a TTL so key rotation is picked up,
//! - on an unknown `kid` refreshes once and retries the lookup,
//! - serializes refreshes so simultaneous misses cause one network call.
//!
//! Any failure to obtain the key set fails closed as `invalid_header`.

use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default bound on a single JWKS fetch.
const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Description returned when the signing key cannot be resolved.
pub const KEY_NOT_FOUND: &str = "Unable to find appropriate key.";

/// Description returned when the identity provider cannot be reached.
const JWKS_UNAVAILABLE: &str = "Unable to fetch signing keys.";

/// RSA JSON Web Key as published by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (always "RSA" for RS256).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Algorithm (should be "RS256" when present).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

/// JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Source of the key set.
///
/// Production uses [`HttpJwksFetcher`]; tests and offline setups can supply
/// a [`StaticJwksFetcher`] or their own implementation.
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Fetch the current key set.
    ///
    /// Implementations map every failure (network, timeout, status, parse)
    /// to `AuthError::InvalidHeader`.
    async fn fetch_jwks(&self) -> Result<JwksResponse, AuthError>;
}

/// Fetches the key set over HTTP(S) with a bounded timeout.
pub struct HttpJwksFetcher {
    jwks_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpJwksFetcher {
    /// Create a fetcher for `jwks_url` with the default 5 second timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_timeout(jwks_url, Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "drinks.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            timeout,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    #[instrument(skip_all, name = "drinks.auth.jwks.fetch")]
    async fn fetch_jwks(&self) -> Result<JwksResponse, AuthError> {
        tracing::debug!(target: "drinks.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let unavailable = || AuthError::InvalidHeader(JWKS_UNAVAILABLE.to_string());

        // The client timeout covers the request; this outer bound also covers
        // the fallback client, which has none.
        let fetch = async {
            let response = self
                .http_client
                .get(&self.jwks_url)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to fetch JWKS");
                    unavailable()
                })?;

            if !response.status().is_success() {
                tracing::error!(
                    target: "drinks.auth.jwks",
                    status = %response.status(),
                    "JWKS endpoint returned error"
                );
                return Err(unavailable());
            }

            response.json::<JwksResponse>().await.map_err(|e| {
                tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to parse JWKS response");
                unavailable()
            })
        };

        tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| {
                tracing::error!(
                    target: "drinks.auth.jwks",
                    timeout_ms = self.timeout.as_millis() as u64,
                    "JWKS fetch timed out"
                );
                unavailable()
            })?
    }
}

/// Serves a fixed key set.
#[derive(Debug, Clone, Default)]
pub struct StaticJwksFetcher {
    jwks: JwksResponse,
}

impl StaticJwksFetcher {
    pub fn new(jwks: JwksResponse) -> Self {
        Self { jwks }
    }
}

#[async_trait]
impl JwksFetcher for StaticJwksFetcher {
    async fn fetch_jwks(&self) -> Result<JwksResponse, AuthError> {
        Ok(self.jwks.clone())
    }
}

/// Cached JWKS data with expiry time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this cache entry expires.
    expires_at: Instant,

    /// Incremented on every refresh.
    generation: u64,
}

/// Thread-safe JWKS cache in front of a [`JwksFetcher`].
pub struct JwksClient {
    fetcher: Arc<dyn JwksFetcher>,

    cache: RwLock<Option<CachedJwks>>,

    /// Held for the duration of a refresh.
    refresh_lock: Mutex<()>,

    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a client with the default 5 minute cache TTL.
    pub fn new(fetcher: Arc<dyn JwksFetcher>) -> Self {
        Self::with_ttl(fetcher, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a client with a custom cache TTL.
    pub fn with_ttl(fetcher: Arc<dyn JwksFetcher>, cache_ttl: Duration) -> Self {
        Self {
            fetcher,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    /// Get a JWK by key ID.
    ///
    /// Serves from cache when the entry is fresh and holds `kid`. Otherwise
    /// refreshes once (unless a concurrent refresh already happened after
    /// this lookup started) and retries.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidHeader` if the key set cannot be fetched or does
    /// not contain `kid` after the refresh.
    #[instrument(skip_all, fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let seen_generation = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.expires_at > Instant::now() => {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "drinks.auth.jwks", "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    tracing::debug!(target: "drinks.auth.jwks", "Key not found in JWKS cache");
                    Some(cached.generation)
                }
                Some(cached) => {
                    tracing::debug!(target: "drinks.auth.jwks", "JWKS cache expired");
                    Some(cached.generation)
                }
                None => None,
            }
        };

        self.refresh_after(seen_generation).await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "drinks.auth.jwks", "Key not found in JWKS after refresh");
        Err(AuthError::InvalidHeader(KEY_NOT_FOUND.to_string()))
    }

    /// Refresh unless another task refreshed since `seen_generation` was read.
    async fn refresh_after(&self, seen_generation: Option<u64>) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let refreshed_meanwhile = seen_generation.map_or(true, |g| cached.generation > g);
                if refreshed_meanwhile && cached.expires_at > Instant::now() {
                    tracing::debug!(target: "drinks.auth.jwks", "JWKS refreshed by concurrent request");
                    return Ok(());
                }
            }
        }

        self.refresh_cache().await
    }

    /// Fetch the key set and replace the cache. Caller holds `refresh_lock`.
    async fn refresh_cache(&self) -> Result<(), AuthError> {
        let start = Instant::now();
        let jwks = match self.fetcher.fetch_jwks().await {
            Ok(jwks) => jwks,
            Err(e) => {
                record_jwks_refresh("error", start.elapsed());
                return Err(e);
            }
        };

        // Later duplicates of a kid replace earlier ones
        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "drinks.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );
        record_jwks_refresh("success", start.elapsed());

        let mut cache = self.cache.write().await;
        let generation = cache.as_ref().map_or(1, |cached| cached.generation + 1);
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
            generation,
        });

        Ok(())
    }

    /// Force refresh the cache.
    pub async fn force_refresh(&self) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_cache().await
    }

    /// Number of keys currently cached (0 when empty or never fetched).
    pub async fn cached_key_count(&self) -> usize {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }

    /// Clear the cache.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}
