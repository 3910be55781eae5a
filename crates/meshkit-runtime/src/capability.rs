//! Capability registration and the HTTP handler seam a caller hooks
//! custom logic into.

use async_trait::async_trait;
use meshkit_core::{Capability, MeshError};
use serde_json::Value;
use std::sync::Arc;

/// A caller-supplied handler invoked on a capability's endpoint. Receives
/// the decoded JSON request body, returns the JSON response body or a
/// [`MeshError`] that the mux maps to an HTTP status.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    async fn handle(&self, input: Value) -> Result<Value, MeshError>;
}

/// A synchronous, best-effort liveness check mounted behind `/health`
/// — returns 503 if any registered custom check fails.
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self) -> bool;
}

/// A capability as tracked by a running component: the wire-serializable
/// [`Capability`] plus the handler mounted at its endpoint, if any.
#[derive(Clone)]
pub struct RegisteredCapability {
    pub spec: Capability,
    pub handler: Option<Arc<dyn CapabilityHandler>>,
}

impl RegisteredCapability {
    pub fn new(spec: Capability, handler: Option<Arc<dyn CapabilityHandler>>) -> Self {
        Self { spec, handler }
    }
}
