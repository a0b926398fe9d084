use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenVerifier;
use crate::config::{AppConfig, Environment, SecurityConfig};
use crate::database::Storage;
use crate::handlers::{protected, public};
use crate::middleware::bearer_token_middleware;
use crate::services::FeedService;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedService>,
    pub storage: Arc<dyn Storage>,
    /// Deadline for storage calls made directly by handlers
    pub operation_timeout: Duration,
}

impl AppState {
    pub fn new(verifier: Arc<dyn TokenVerifier>, storage: Arc<dyn Storage>, config: &AppConfig) -> Self {
        let operation_timeout = config.database.operation_timeout();
        let feed = FeedService::new(verifier, storage.clone(), operation_timeout);
        Self {
            feed: Arc::new(feed),
            storage,
            operation_timeout,
        }
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root_get))
        .route("/health", get(public::health_get))
        // Protected
        .merge(dashboard_routes())
        // Global middleware
        .layer(cors_layer(&config.environment, &config.security))
        .layer(TimeoutLayer::new(Duration::from_secs(config.api.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/dashboard", get(protected::dashboard_get))
        .route_layer(axum::middleware::from_fn(bearer_token_middleware))
}

fn cors_layer(environment: &Environment, security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if matches!(environment, Environment::Development) {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
