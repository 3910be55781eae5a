//! Shared implementation behind [`crate::tool::BaseTool`] and
//! [`crate::agent::BaseAgent`].
//!
//! Both component shapes are, structurally, the same core: a mutex-guarded
//! mutable capability list and lifecycle state, a set of optional
//! collaborators, an HTTP mux, and (once initialized) a registered
//! `ServiceInfo` with a running heartbeat. The only difference between a
//! Tool and an Agent is which trait is implemented on top — `ComponentCore`
//! itself never exposes `discover`.

use crate::capability::{CapabilityHandler, HealthCheck, RegisteredCapability};
use crate::collaborators::{AiClient, Memory, Telemetry};
use crate::http;
use crate::state::ComponentState;
use axum::Router;
use meshkit_config::{Config, build_metadata, resolve_address};
use meshkit_core::logging::Logger;
use meshkit_core::{Capability, ComponentType, ErrorKind, MeshError, ServiceId, ServiceInfo};
use meshkit_registry::{Discovery, Registry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Collaborators a component may carry, all optional.
#[derive(Default)]
pub struct Collaborators {
    pub logger: Option<Arc<dyn Logger>>,
    pub memory: Option<Arc<dyn Memory>>,
    pub telemetry: Option<Arc<dyn Telemetry>>,
    pub ai: Option<Arc<dyn AiClient>>,
}

/// Exposes the shared kernel behind a `BaseTool` or `BaseAgent` so
/// `meshkit-gateway`'s orchestrator can drive lifecycle and mount CORS
/// without needing `Tool`/`Agent` itself to be object-safe for every
/// method.
pub trait AsCore: Send + Sync {
    fn core(&self) -> &Arc<ComponentCore>;

    /// Wire a `Discovery` backend into the component, if it carries one.
    /// A no-op for shapes with no discovery slot (`BaseTool`); `BaseAgent`
    /// overrides this to actually wire it.
    fn set_discovery_if_absent(&self, _discovery: Arc<dyn Discovery>) {}
}

pub struct ComponentCore {
    pub id: ServiceId,
    pub name: String,
    pub kind: ComponentType,
    pub description: String,
    pub config: Config,
    pub collaborators: Collaborators,
    capabilities: Mutex<Vec<RegisteredCapability>>,
    health_checks: Mutex<Vec<Arc<dyn HealthCheck>>>,
    router: Mutex<Option<Router>>,
    state: Mutex<ComponentState>,
    service_info: Mutex<Option<ServiceInfo>>,
    registry: Mutex<Option<Arc<dyn Registry>>>,
    cancel: Mutex<Option<CancellationToken>>,
    heartbeat: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ComponentCore {
    pub fn new(
        name: impl Into<String>,
        kind: ComponentType,
        description: impl Into<String>,
        config: Config,
        collaborators: Collaborators,
        registry: Option<Arc<dyn Registry>>,
    ) -> Arc<Self> {
        let core = Arc::new(Self {
            id: ServiceId::new(),
            name: name.into(),
            kind,
            description: description.into(),
            config,
            collaborators,
            capabilities: Mutex::new(Vec::new()),
            health_checks: Mutex::new(Vec::new()),
            router: Mutex::new(None),
            state: Mutex::new(ComponentState::Uninitialized),
            service_info: Mutex::new(None),
            registry: Mutex::new(registry),
            cancel: Mutex::new(None),
            heartbeat: Mutex::new(None),
        });

        let health_path = "/health".to_string();
        let router = http::standard_router(core.clone(), &health_path);
        *core.router.lock() = Some(router);
        core
    }

    pub fn state(&self) -> ComponentState {
        *self.state.lock()
    }

    /// Whether a heartbeat task is currently running — elided for
    /// registry backends that don't support liveness refresh.
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.lock().is_some()
    }

    /// Inject a registry/discovery backend, unless one is already wired —
    /// explicit user-supplied collaborators always win.
    pub fn set_registry_if_absent(&self, registry: Arc<dyn Registry>) {
        let mut guard = self.registry.lock();
        if guard.is_none() {
            *guard = Some(registry);
        }
    }

    pub fn registry(&self) -> Option<Arc<dyn Registry>> {
        self.registry.lock().clone()
    }

    /// Wraps the mux in a CORS layer when the caller asks for one. The
    /// core never invents a policy — it only
    /// mounts the permissive-by-default layer `tower_http` ships, matching
    /// the originating framework's own gateway default.
    pub fn enable_cors(&self) {
        use tower_http::cors::CorsLayer;

        let mut guard = self.router.lock();
        let router = guard.take().expect("router always present before start");
        *guard = Some(router.layer(CorsLayer::permissive()));
    }

    /// Mutex-guarded append; derives the endpoint when empty and mounts the
    /// handler (or the generic introspection handler) on the mux.
    pub fn register_capability(
        self: &Arc<Self>,
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint: impl Into<String>,
        handler: Option<Arc<dyn CapabilityHandler>>,
    ) {
        let spec = Capability::new(name, description, endpoint);
        let registered = RegisteredCapability::new(spec, handler);

        let mut router_guard = self.router.lock();
        let router = router_guard.take().expect("router always present between calls");
        let router = http::mount_capability(router, self.clone(), registered.clone());
        *router_guard = Some(router);
        drop(router_guard);

        self.capabilities.lock().push(registered);
    }

    pub fn register_health_check(&self, check: Arc<dyn HealthCheck>) {
        self.health_checks.lock().push(check);
    }

    /// Runs every registered check; `true` only if all pass.
    pub fn run_health_checks(&self) -> bool {
        self.health_checks.lock().iter().all(|c| c.check())
    }

    /// Snapshot of the component's capabilities in wire form — external
    /// callers never see a live reference into the component.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.lock().iter().map(|r| r.spec.clone()).collect()
    }

    /// Registers with the wired backend (best-effort, non-fatal) and
    /// starts the heartbeat, then transitions to `Initialized`.
    pub async fn initialize(self: &Arc<Self>, cancel: CancellationToken) -> Result<(), MeshError> {
        if self.state() != ComponentState::Uninitialized {
            return Err(MeshError::new(
                "ComponentCore::initialize",
                ErrorKind::AlreadyStarted,
                format!("component {} already initialized", self.name),
            ));
        }

        let (address, port) = resolve_address(&self.config);
        let mut info = ServiceInfo::new(self.id, self.name.clone(), self.kind, self.description.clone(), address, port);
        info.capabilities = self.capabilities();
        info.metadata = build_metadata(&self.config);

        if let Some(registry) = self.registry() {
            match registry.register(info.clone()).await {
                Ok(()) => {
                    // Spec Invariant 7: heartbeat is only started for backends
                    // that support liveness refresh; in-memory mocks have no
                    // TTL to extend and are elided here.
                    if registry.supports_liveness() {
                        let interval = Duration::from_secs(self.config.discovery.heartbeat_interval_secs.max(1));
                        let handle = meshkit_registry::spawn_heartbeat(registry, info.clone(), interval, cancel.clone());
                        *self.heartbeat.lock() = Some(handle);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        component = %self.name,
                        error = %err,
                        "initial registration failed; continuing without discovery (graceful degradation)"
                    );
                }
            }
        } else if let Some(logger) = &self.collaborators.logger {
            logger.warn("no registry/discovery backend wired; skipping registration", &[]);
        }

        *self.service_info.lock() = Some(info);
        *self.cancel.lock() = Some(cancel);
        *self.state.lock() = ComponentState::Initialized;
        Ok(())
    }

    /// Effective port: explicit argument > config > 8080. Serves the mux
    /// until the shutdown `CancellationToken` fires or the listener errors.
    pub async fn start(self: &Arc<Self>, port: Option<u16>) -> Result<(), MeshError> {
        let effective_port = port.unwrap_or(if self.config.core.port != 0 { self.config.core.port } else { 8080 });
        let bind_address = if self.config.core.bind_address.is_empty() {
            "127.0.0.1".to_string()
        } else {
            self.config.core.bind_address.clone()
        };

        let router = self.router.lock().take().expect("router always present at start");
        let router = router.layer(tower::timeout::TimeoutLayer::new(self.config.http.write_timeout));

        let listener = tokio::net::TcpListener::bind((bind_address.as_str(), effective_port))
            .await
            .map_err(|e| {
                MeshError::new(
                    "ComponentCore::start",
                    ErrorKind::ConnectionFailed,
                    format!("failed to bind {bind_address}:{effective_port}: {e}"),
                )
            })?;

        *self.state.lock() = ComponentState::Running;

        let cancel = self.cancel.lock().clone().unwrap_or_default();
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await;

        *self.state.lock() = ComponentState::Stopped;
        result.map_err(|e| MeshError::new("ComponentCore::start", ErrorKind::RequestFailed, format!("server error: {e}")))
    }

    /// Cancels the heartbeat, triggers the HTTP graceful shutdown `start`
    /// is waiting on, and best-effort unregisters, bounded by the
    /// configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<(), MeshError> {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel.cancel();
        }
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.abort();
        }

        if let (Some(registry), Some(info)) = (self.registry(), self.service_info.lock().clone()) {
            let outcome = tokio::time::timeout(self.config.http.shutdown_timeout, registry.unregister(info.id)).await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(component = %self.name, error = %err, "unregister failed during shutdown"),
                Err(_) => tracing::warn!(component = %self.name, "unregister timed out during shutdown"),
            }
        }
        Ok(())
    }
}
