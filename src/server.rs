//! axum integration for inbound security resolution.
//!
//! `require_security` runs the resolver for one operation before the handler
//! and stores the [`SecurityContext`] in the request extensions; handlers read
//! it back with the [`Authenticated`] extractor.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::model::{ErrorMessage, User, operations};
use crate::security::{SecurityContext, SecurityError, SecurityResolver, SecurityScheme};
use crate::types::OperationName;

/// Per-operation state for [`require_security`].
#[derive(Clone)]
pub struct SecurityLayerState {
    resolver: SecurityResolver,
    operation: OperationName,
    /// Alternatives, tried in order
    schemes: Arc<[SecurityScheme]>,
}

impl SecurityLayerState {
    pub fn new(
        resolver: SecurityResolver,
        operation: impl Into<OperationName>,
        schemes: &[SecurityScheme],
    ) -> Self {
        Self {
            resolver,
            operation: operation.into(),
            schemes: Arc::from(schemes),
        }
    }
}

/// Middleware authenticating a request before it reaches the handler.
///
/// Install with `middleware::from_fn_with_state(state, require_security)`.
pub async fn require_security(
    State(state): State<SecurityLayerState>,
    req: Request,
    next: Next,
) -> Result<Response, SecurityError> {
    let (parts, body) = req.into_parts();
    let ctx = state
        .resolver
        .authenticate(&state.operation, &state.schemes, &parts)
        .await
        .inspect_err(|e| warn!("Rejected request for {}: {}", state.operation, e))?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let message = match &self {
            SecurityError::Unauthenticated { .. } => "You must log in first.".to_string(),
            other => other.to_string(),
        };
        (StatusCode::UNAUTHORIZED, Json(ErrorMessage::new(message))).into_response()
    }
}

/// Extractor for the context stored by [`require_security`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub SecurityContext);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorMessage>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Authenticated)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorMessage::new(
                    "SecurityContext not found - security middleware not configured",
                )),
            ))
    }
}

/// Stub API server exposing `GET /api/v2/me` behind all three schemes.
pub fn create_stub_router(resolver: SecurityResolver) -> Router {
    let me = SecurityLayerState::new(resolver, operations::GET_CURRENT_USER, &SecurityScheme::ALL);

    let protected = Router::new()
        .route("/api/v2/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(me, require_security));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn current_user(Authenticated(ctx): Authenticated) -> Json<User> {
    debug!("Serving {} for {}", ctx.operation(), ctx.principal());
    Json(User {
        id: ctx.principal().to_string(),
        login: ctx.principal().to_string(),
        name: ctx.display(),
    })
}
