//! Route-token dispatch.
//!
//! - `GET /jwt/route?jwt=<token>`
//! - `GET /jwt/route/:jwt`
//!
//! The token is claimed through the `ActionProfile` (assuming its identity),
//! and the action it names is looked up in the `ActionRegistry`. Tokens that
//! cannot be claimed and actions that are not registered both answer 404.

use crate::context::{RequestContext, RequestSession, Session};
use crate::errors::AuthzError;
use crate::middleware::{AntiForgerySource, AuthenticatedIdentity};
use crate::models::{Identity, ParamValue, RouteDescriptor};
use crate::services::ActionProfile;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// What a registered action receives.
#[derive(Debug, Clone)]
pub struct ActionInvocation {
    pub action: String,
    pub params: BTreeMap<String, ParamValue>,
    /// Session user after the token's identity (if any) was assumed.
    pub identity: Option<Identity>,
}

type ActionHandler = Arc<dyn Fn(ActionInvocation) -> Result<Value, AuthzError> + Send + Sync>;

/// Named actions a route token may invoke.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, ActionHandler>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<&String> = self.handlers.keys().collect();
        actions.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &actions)
            .finish()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `action`, replacing any earlier one.
    pub fn register<F>(mut self, action: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionInvocation) -> Result<Value, AuthzError> + Send + Sync + 'static,
    {
        self.handlers.insert(action.into(), Arc::new(handler));
        self
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Run the handler registered for the descriptor's action.
    ///
    /// # Errors
    ///
    /// Returns `RouteNotFound` for an unregistered action, otherwise whatever
    /// the handler returns.
    pub fn dispatch(
        &self,
        descriptor: RouteDescriptor,
        identity: Option<Identity>,
    ) -> Result<Value, AuthzError> {
        let (action, params) = descriptor.into_parts();

        let handler = self.handlers.get(&action).ok_or_else(|| {
            tracing::warn!(target: "authz.route", action = %action, "No handler registered for action");
            AuthzError::RouteNotFound(action.clone())
        })?;

        handler(ActionInvocation {
            action,
            params,
            identity,
        })
    }
}

/// State for the route dispatch handlers.
#[derive(Clone)]
pub struct RouteState {
    pub actions: ActionProfile,
    pub registry: ActionRegistry,
    pub anti_forgery: Arc<dyn AntiForgerySource>,
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub jwt: Option<String>,
}

/// Handler for `GET /jwt/route?jwt=<token>`.
#[instrument(skip_all, name = "authz.route.dispatch")]
pub async fn route_by_query(
    State(state): State<Arc<RouteState>>,
    Query(query): Query<RouteQuery>,
    current: Option<Extension<AuthenticatedIdentity>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthzError> {
    let jwt = query
        .jwt
        .filter(|jwt| !jwt.is_empty())
        .ok_or_else(|| AuthzError::MissingParameter("jwt".to_string()))?;

    run_route(&state, &jwt, current.map(|Extension(c)| c.0), &headers).map(Json)
}

/// Handler for `GET /jwt/route/:jwt`.
#[instrument(skip_all, name = "authz.route.dispatch")]
pub async fn route_by_path(
    State(state): State<Arc<RouteState>>,
    Path(jwt): Path<String>,
    current: Option<Extension<AuthenticatedIdentity>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthzError> {
    run_route(&state, &jwt, current.map(|Extension(c)| c.0), &headers).map(Json)
}

fn run_route(
    state: &RouteState,
    jwt: &str,
    current: Option<Identity>,
    headers: &HeaderMap,
) -> Result<Value, AuthzError> {
    let anti_forgery = state.anti_forgery.for_request(headers);
    let session = match current {
        Some(identity) => RequestSession::with_identity(identity),
        None => RequestSession::new(),
    };
    let ctx = RequestContext::new(anti_forgery.as_ref(), &session);

    let descriptor = state
        .actions
        .claim(jwt, true, ctx)
        .ok_or_else(|| AuthzError::RouteNotFound("Invalid token.".to_string()))?;

    tracing::info!(
        target: "authz.route",
        action = %descriptor.action(),
        "Dispatching route token"
    );

    state.registry.dispatch(descriptor, session.identity())
}
