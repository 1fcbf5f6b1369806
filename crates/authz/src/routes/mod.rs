//! HTTP routes.
//!
//! Defines the Axum router and application state.

use crate::config::{BearerConfig, Config};
use crate::context::{Clock, IdentityDirectory};
use crate::handlers::{self, ActionRegistry, RouteState};
use crate::middleware::{
    require_bearer_auth, AntiForgerySource, BearerAuthState, HeaderAntiForgerySource,
};
use crate::services::Profiles;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity and action token profiles.
    pub profiles: Profiles,

    /// Actions route tokens may invoke.
    pub registry: ActionRegistry,

    /// Bearer header, scheme and realm.
    pub bearer: BearerConfig,

    /// Per-request anti-forgery collaborator.
    pub anti_forgery: Arc<dyn AntiForgerySource>,
}

impl AppState {
    /// State for `config`, reading anti-forgery tokens from the configured
    /// request header.
    pub fn from_config(
        config: &Config,
        directory: Arc<dyn IdentityDirectory>,
        clock: Arc<dyn Clock>,
        registry: ActionRegistry,
    ) -> Self {
        Self {
            profiles: Profiles::from_config(config, directory, clock),
            registry,
            bearer: config.bearer.clone(),
            anti_forgery: Arc::new(HeaderAntiForgerySource::new(
                config.bearer.anti_forgery_header.as_str(),
            )),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/jwt/route?jwt=<token>` - Route-token dispatch - public
/// - `/jwt/route/:jwt` - Route-token dispatch - public
/// - `/jwt/me` - Current identity - requires a bearer token
/// - TraceLayer for request logging
pub fn build_routes(state: AppState) -> Router {
    let bearer_state = Arc::new(BearerAuthState {
        identity: state.profiles.identity.clone(),
        config: state.bearer.clone(),
        anti_forgery: Arc::clone(&state.anti_forgery),
    });

    let route_state = Arc::new(RouteState {
        actions: state.profiles.actions,
        registry: state.registry,
        anti_forgery: state.anti_forgery,
    });

    // Public routes (no bearer token required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/jwt/route", get(handlers::route_by_query))
        .route("/jwt/route/:jwt", get(handlers::route_by_path))
        .with_state(route_state);

    // Protected routes (bearer token required)
    let protected_routes = protect(
        Router::new().route("/jwt/me", get(handlers::get_me)),
        bearer_state,
    );

    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
}

/// Put every route of `router` behind the bearer-auth middleware.
pub fn protect(router: Router, bearer_state: Arc<BearerAuthState>) -> Router {
    router.route_layer(middleware::from_fn_with_state(
        bearer_state,
        require_bearer_auth,
    ))
}
