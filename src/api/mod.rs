use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, RateLimiter, SeaOrmAuthService};

pub mod auth;
mod error;
pub mod events;
mod guard;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub rate_limiter: Arc<RateLimiter>,

    pub static_dir: String,

    pub cors_allowed_origins: Vec<String>,

    pub force_secure_cookies: bool,
}

pub async fn create_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    create_app_state_with_store(config, store)
}

/// Split out so tests can inject an in-memory store.
pub fn create_app_state_with_store(config: &Config, store: Store) -> anyhow::Result<Arc<AppState>> {
    let rate_limiter = Arc::new(RateLimiter::new(&config.security.auth_throttle));

    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        config.security.clone(),
        rate_limiter.clone(),
    ));

    Ok(Arc::new(AppState {
        store,
        auth,
        rate_limiter,
        static_dir: config.server.static_dir.clone(),
        cors_allowed_origins: config.server.cors_allowed_origins.clone(),
        force_secure_cookies: config.server.force_secure_cookies,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/check", get(auth::session_check))
        .with_state(state.clone());

    let cors_layer = if state.cors_allowed_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .cors_allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(origins)
    };

    let pages = ServeDir::new(&state.static_dir)
        .not_found_service(ServeFile::new(format!("{}/index.html", state.static_dir)));

    Router::new()
        .nest("/api", api_router)
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::page_guard,
        ))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(events::list_events))
        .route("/events", post(events::create_event))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}", patch(events::update_event))
        .route("/events/{id}", delete(events::delete_event))
        .route("/events/{id}/rsvp", post(events::submit_rsvp))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
