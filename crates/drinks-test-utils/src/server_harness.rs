//! Test server harness for E2E testing
//!
//! Provides `TestDrinksServer` for spawning real drinks-service instances
//! against a mock identity provider.

use crate::jwks_mock::{jwks_url, mount_jwks};
use crate::rsa_fixtures::TestKeypair;
use crate::token_builders::{TestClaimsBuilder, TEST_AUDIENCE, TEST_AUTH_DOMAIN};
use drinks_service::auth::{HttpJwksFetcher, JwksClient, JwtValidator};
use drinks_service::config::Config;
use drinks_service::models::NewDrink;
use drinks_service::observability::metrics::init_metrics_recorder;
use drinks_service::repositories::{DrinkRepository, InMemoryDrinkRepository};
use drinks_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// Global metrics handle for test servers.
///
/// The Prometheus recorder can be installed once per process; servers in the
/// same test binary share it.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics handle backed by the installed recorder, or a detached one when
/// another recorder is already installed.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Configuration for `TEST_AUTH_DOMAIN`/`TEST_AUDIENCE` with the JWKS
/// fetched from `jwks_url`.
pub fn test_config(jwks_url: &str) -> Result<Config, anyhow::Error> {
    let vars = HashMap::from([
        ("AUTH0_DOMAIN".to_string(), TEST_AUTH_DOMAIN.to_string()),
        ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
        ("AUTH_JWKS_URL".to_string(), jwks_url.to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
    ]);

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Test harness for spawning the drinks service in E2E tests.
///
/// The mock identity provider serves [`TestKeypair::primary`]; use
/// [`TestDrinksServer::token`] for correctly signed tokens.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_detail_requires_permission() -> Result<()> {
///     let server = TestDrinksServer::spawn().await?;
///     let token = server.token(&["get:drinks-detail"]);
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/drinks-detail", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestDrinksServer {
    addr: SocketAddr,
    config: Config,
    mock_server: MockServer,
    repository: Arc<InMemoryDrinkRepository>,
    keypair: TestKeypair,
    _handle: JoinHandle<()>,
}

impl TestDrinksServer {
    /// Spawn a server with an empty catalog.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_drinks(Vec::new()).await
    }

    /// Spawn a server whose catalog starts with `drinks` (ids from 1).
    ///
    /// The server will:
    /// - Start a mock JWKS endpoint serving the primary test key
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_drinks(drinks: Vec<NewDrink>) -> Result<Self, anyhow::Error> {
        let mock_server = MockServer::start().await;
        let keypair = TestKeypair::primary();
        mount_jwks(&mock_server, &[&keypair]).await;

        let config = test_config(&jwks_url(&mock_server))?;

        let fetcher = Arc::new(HttpJwksFetcher::with_timeout(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_fetch_timeout_seconds),
        ));
        let jwks_client = Arc::new(JwksClient::with_ttl(
            fetcher,
            Duration::from_secs(config.jwks_cache_ttl_seconds),
        ));
        let jwt_validator = Arc::new(JwtValidator::from_config(&config, jwks_client));

        let repository = Arc::new(InMemoryDrinkRepository::with_drinks(drinks));
        let state = Arc::new(AppState {
            repository: repository.clone() as Arc<dyn DrinkRepository>,
            jwt_validator,
        });

        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            mock_server,
            repository,
            keypair,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mock identity provider (for adding expectations or rotating keys).
    pub fn mock_server(&self) -> &MockServer {
        &self.mock_server
    }

    /// The catalog backing the server.
    pub fn repository(&self) -> &Arc<InMemoryDrinkRepository> {
        &self.repository
    }

    /// The key the mock JWKS serves.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// Claims builder preset with the server's issuer and audience.
    pub fn claims(&self) -> TestClaimsBuilder {
        TestClaimsBuilder::new(&self.config.issuer(), &self.config.api_audience)
    }

    /// A valid token granting `permissions`.
    pub fn token(&self, permissions: &[&str]) -> String {
        self.keypair
            .sign(&self.claims().with_permissions(permissions).build())
    }

    /// Sign arbitrary claims with the served key.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.keypair.sign(claims)
    }
}

impl Drop for TestDrinksServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
