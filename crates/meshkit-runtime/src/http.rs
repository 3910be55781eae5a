//! Standard endpoints and capability route mounting — the standard HTTP
//! endpoints mounted on every component.

use crate::capability::RegisteredCapability;
use crate::core::ComponentCore;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{any, get},
    Router,
};
use serde_json::{Value, json};
use std::sync::Arc;

/// `GET {health_path}` -> `200` with `{status, component, timestamp}`, or
/// `503` if any registered custom health check fails.
async fn health_handler(State(core): State<Arc<ComponentCore>>) -> impl IntoResponse {
    let all_healthy = core.run_health_checks();
    let body = json!({
        "status": if all_healthy { "healthy" } else { "unhealthy" },
        "component": core.name,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    let status = if all_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}

/// `GET /api/capabilities` -> JSON array of the component's capabilities,
/// `handler` field omitted in wire form (it isn't part of
/// [`meshkit_core::Capability`] to begin with).
async fn capabilities_handler(State(core): State<Arc<ComponentCore>>) -> impl IntoResponse {
    Json(core.capabilities())
}

/// Generic introspection handler mounted when a capability has no
/// caller-supplied handler: returns `{capability, description}`.
async fn introspection_handler(
    State((core, name)): State<(Arc<ComponentCore>, String)>,
) -> impl IntoResponse {
    let description = core
        .capabilities()
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.description)
        .unwrap_or_default();
    Json(json!({ "capability": name, "description": description }))
}

/// Invokes a caller-supplied [`CapabilityHandler`], mapping its
/// [`meshkit_core::MeshError`] to an HTTP status the way its error
/// taxonomy maps onto HTTP.
async fn capability_handler(
    State(cap): State<Arc<RegisteredCapability>>,
    body: Option<Json<Value>>,
) -> impl IntoResponse {
    let Some(handler) = cap.handler.as_ref() else {
        // Mounted defensively; register_capability always picks the
        // introspection handler when none is supplied, so this arm is
        // unreachable in practice.
        return (StatusCode::NOT_IMPLEMENTED, Json(json!({ "error": "no handler" }))).into_response();
    };
    let input = body.map(|Json(v)| v).unwrap_or(Value::Null);
    match handler.handle(input).await {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(err) => {
            let status = error_status(&err);
            (status, Json(json!({ "op": err.op, "kind": err.kind.to_string(), "message": err.message }))).into_response()
        }
    }
}

fn error_status(err: &meshkit_core::MeshError) -> StatusCode {
    use meshkit_core::ErrorKind::*;
    match err.kind {
        InvalidConfiguration | MissingConfiguration | PortOutOfRange => StatusCode::BAD_REQUEST,
        AgentNotFound | CapabilityNotFound | ServiceNotFound => StatusCode::NOT_FOUND,
        CapabilityNotEnabled | AlreadyStarted | AlreadyRegistered | AgentAlreadyExists => StatusCode::CONFLICT,
        Timeout | ContextCanceled => StatusCode::GATEWAY_TIMEOUT,
        CircuitBreakerOpen | DiscoveryUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the router carrying `/health` and `/api/capabilities`, the two
/// endpoints mounted on every component regardless of its registered
/// capabilities.
pub fn standard_router(core: Arc<ComponentCore>, health_path: &str) -> Router {
    Router::new()
        .route(health_path, get(health_handler))
        .route("/api/capabilities", get(capabilities_handler))
        .with_state(core)
}

/// Mount a single capability's endpoint on `router`: the caller-supplied
/// handler if present, else the generic introspection handler.
pub fn mount_capability(router: Router, core: Arc<ComponentCore>, registered: RegisteredCapability) -> Router {
    let endpoint = registered.spec.endpoint.clone();
    if registered.handler.is_some() {
        router.route(&endpoint, any(capability_handler).with_state(Arc::new(registered)))
    } else {
        let name = registered.spec.name.clone();
        router.route(&endpoint, any(introspection_handler).with_state((core, name)))
    }
}
