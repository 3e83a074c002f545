//! HTTP routes for the drinks service.
//!
//! Defines the Axum router and application state.

use crate::auth::{requires_auth, JwtValidator};
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_permission};
use crate::repositories::DrinkRepository;
use axum::{
    http::{header, Method},
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Permission required by `GET /drinks-detail`.
pub const GET_DRINKS_DETAIL: &str = "get:drinks-detail";
/// Permission required by `POST /drinks`.
pub const POST_DRINKS: &str = "post:drinks";
/// Permission required by `PATCH /drinks/:id`.
pub const PATCH_DRINKS: &str = "patch:drinks";
/// Permission required by `DELETE /drinks/:id`.
pub const DELETE_DRINKS: &str = "delete:drinks";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Drink persistence.
    pub repository: Arc<dyn DrinkRepository>,

    /// JWT validator shared by every route guard (one JWKS cache per process).
    pub jwt_validator: Arc<JwtValidator>,
}

/// Wrap `route` so it only runs after the guard for `permission` passes.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    validator: &Arc<JwtValidator>,
    permission: &str,
) -> MethodRouter<Arc<AppState>> {
    let guard = Arc::new(requires_auth(validator.clone(), permission));
    route.route_layer(middleware::from_fn_with_state(guard, require_permission))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `GET /drinks` - public
/// - `GET /drinks-detail` - `get:drinks-detail`
/// - `POST /drinks` - `post:drinks`
/// - `PATCH /drinks/:id` - `patch:drinks`
/// - `DELETE /drinks/:id` - `delete:drinks`
/// - CORS for browser frontends
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let validator = state.jwt_validator.clone();

    let drinks_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/drinks",
            get(handlers::get_drinks).merge(guarded(
                post(handlers::create_drink),
                &validator,
                POST_DRINKS,
            )),
        )
        .route(
            "/drinks-detail",
            guarded(
                get(handlers::get_drinks_detail),
                &validator,
                GET_DRINKS_DETAIL,
            ),
        )
        .route(
            "/drinks/:id",
            guarded(patch(handlers::update_drink), &validator, PATCH_DRINKS).merge(guarded(
                delete(handlers::delete_drink),
                &validator,
                DELETE_DRINKS,
            )),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflight requests before routing
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    drinks_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}
