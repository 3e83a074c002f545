//! Drinks Service
//!
//! Entry point for the coffee shop drinks API.

use drinks_service::auth::{HttpJwksFetcher, JwksClient, JwtValidator};
use drinks_service::config::Config;
use drinks_service::observability::metrics::init_metrics_recorder;
use drinks_service::repositories::{DrinkRepository, InMemoryDrinkRepository, PgDrinkRepository};
use drinks_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drinks_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Drinks Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        auth_domain = %config.auth_domain,
        api_audience = %config.api_audience,
        jwks_url = %config.jwks_url,
        bind_address = %config.bind_address,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    let repository: Arc<dyn DrinkRepository> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_url_with_timeout = add_query_timeout(database_url, 5);
            let db_pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .min_connections(1)
                .acquire_timeout(Duration::from_secs(5))
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(1800))
                .connect(&db_url_with_timeout)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&db_pool)
                .await
                .map_err(|e| {
                    error!("Failed to run database migrations: {}", e);
                    e
                })?;

            info!("Database connection established");
            Arc::new(PgDrinkRepository::new(db_pool))
        }
        None => {
            warn!("DATABASE_URL not set, drinks are kept in memory and lost on restart");
            Arc::new(InMemoryDrinkRepository::new())
        }
    };

    let fetcher = Arc::new(HttpJwksFetcher::with_timeout(
        config.jwks_url.clone(),
        Duration::from_secs(config.jwks_fetch_timeout_seconds),
    ));
    let jwks_client = Arc::new(JwksClient::with_ttl(
        fetcher,
        Duration::from_secs(config.jwks_cache_ttl_seconds),
    ));
    let jwt_validator = Arc::new(JwtValidator::from_config(&config, jwks_client));

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        repository,
        jwt_validator,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Drinks Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Drinks Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}
