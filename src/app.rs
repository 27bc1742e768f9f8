use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::Authorizer;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::DrinkStore;
use crate::handlers;
use crate::middleware::require_permission;
use crate::types::permissions;

/// Shared handler state; everything a handler touches is injected here
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DrinkStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DrinkStore>) -> Self {
        Self { store }
    }
}

pub fn app(state: AppState, authorizer: Authorizer, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Protected, one permission per route
        .merge(drink_routes(&authorizer))
        .fallback(handlers::public::not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security, config.is_development()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pair a handler with the permission it requires
fn gated(
    route: MethodRouter<AppState>,
    authorizer: &Authorizer,
    permission: &'static str,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        authorizer.require(permission),
        require_permission,
    ))
}

fn drink_routes(authorizer: &Authorizer) -> Router<AppState> {
    use axum::routing::{delete, patch, post};
    use handlers::protected as drinks;

    Router::new()
        .route("/drinks", gated(get(drinks::drinks_get), authorizer, permissions::GET_DRINKS))
        .route("/drinks", gated(post(drinks::drinks_post), authorizer, permissions::POST_DRINKS))
        .route(
            "/drinks-detail",
            gated(get(drinks::drinks_detail_get), authorizer, permissions::GET_DRINKS_DETAIL),
        )
        .route(
            "/drinks/:id",
            gated(patch(drinks::drinks_patch), authorizer, permissions::PATCH_DRINKS),
        )
        .route(
            "/drinks/:id",
            gated(delete(drinks::drinks_delete), authorizer, permissions::DELETE_DRINKS),
        )
}

fn cors_layer(security: &SecurityConfig, development: bool) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
