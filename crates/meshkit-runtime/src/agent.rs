//! The active, discovery-capable component shape.
//!
//! `Agent: Tool` adds exactly one operation — `discover` — over the passive
//! contract. That a `dyn Tool` value can never be asked to discover, while
//! every `dyn Agent` can be passed anywhere a `dyn Tool` is expected, is
//! enforced entirely by the type system; there is no runtime capability
//! flag standing in for it.

use crate::capability::{CapabilityHandler, HealthCheck};
use crate::core::{AsCore, Collaborators, ComponentCore};
use crate::state::ComponentState;
use crate::tool::Tool;
use async_trait::async_trait;
use meshkit_config::Config;
use meshkit_core::{Capability, ComponentType, ErrorKind, HealthStatus, MeshError, ServiceId, ServiceInfo};
use meshkit_registry::{Discovery, Registry, ServiceFilter};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Adapts a `Discovery` backend to the narrower `Registry` interface so it
/// can be installed into [`ComponentCore`]'s single `Option<Arc<dyn
/// Registry>>` slot. Plain delegation, no trait-object upcasting involved:
/// `Arc<dyn Discovery>` coerces to `Arc<dyn Registry>` only if `Discovery`
/// were upcast-compatible, which this workspace's MSRV cannot rely on — so
/// this newtype re-implements `Registry` by forwarding to the wrapped
/// `Discovery` instead.
struct DiscoveryAsRegistry(Arc<dyn Discovery>);

#[async_trait]
impl Registry for DiscoveryAsRegistry {
    async fn register(&self, info: ServiceInfo) -> Result<(), MeshError> {
        self.0.register(info).await
    }

    async fn update_health(&self, id: ServiceId, status: HealthStatus) -> Result<(), MeshError> {
        self.0.update_health(id, status).await
    }

    async fn unregister(&self, id: ServiceId) -> Result<(), MeshError> {
        self.0.unregister(id).await
    }

    fn supports_liveness(&self) -> bool {
        self.0.supports_liveness()
    }
}

/// `Tool` extended with discovery. Anywhere a `Tool` is required, an `Agent`
/// may be substituted; the reverse does not type-check.
#[async_trait]
pub trait Agent: Tool {
    async fn discover(&self, filter: ServiceFilter) -> Result<Vec<ServiceInfo>, MeshError>;
}

/// Base implementation of [`Agent`]. Holds a `Discovery` reference in
/// addition to the `ComponentCore`'s uniform `Registry` slot (wired via
/// [`DiscoveryAsRegistry`]) so registration/heartbeat keep working while
/// `discover` has a concrete backend to call.
pub struct BaseAgent {
    core: Arc<ComponentCore>,
    discovery: Mutex<Option<Arc<dyn Discovery>>>,
}

impl BaseAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        config: Config,
        collaborators: Collaborators,
        discovery: Option<Arc<dyn Discovery>>,
    ) -> Self {
        let registry: Option<Arc<dyn Registry>> =
            discovery.clone().map(|d| Arc::new(DiscoveryAsRegistry(d)) as Arc<dyn Registry>);
        Self {
            core: ComponentCore::new(name, ComponentType::Agent, description, config, collaborators, registry),
            discovery: Mutex::new(discovery),
        }
    }

    pub fn state(&self) -> ComponentState {
        self.core.state()
    }

    pub fn register_capability(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint: impl Into<String>,
        handler: Option<Arc<dyn CapabilityHandler>>,
    ) {
        self.core.register_capability(name, description, endpoint, handler);
    }

    pub fn register_health_check(&self, check: Arc<dyn HealthCheck>) {
        self.core.register_health_check(check);
    }

    /// Wire (or replace, if absent) both the discovery reference and the
    /// core's registry slot. Explicit user override wins; this is
    /// only a no-op against the core slot if one is already wired there.
    pub fn set_discovery_if_absent(&self, discovery: Arc<dyn Discovery>) {
        let mut guard = self.discovery.lock();
        if guard.is_none() {
            self.core.set_registry_if_absent(Arc::new(DiscoveryAsRegistry(discovery.clone())));
            *guard = Some(discovery);
        }
    }

    pub fn core(&self) -> &Arc<ComponentCore> {
        &self.core
    }
}

#[async_trait]
impl Tool for BaseAgent {
    fn id(&self) -> ServiceId {
        self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Agent
    }

    fn register_capability(
        &self,
        name: impl Into<String> + Send,
        description: impl Into<String> + Send,
        endpoint: impl Into<String> + Send,
        handler: Option<Arc<dyn CapabilityHandler>>,
    ) {
        self.core.register_capability(name, description, endpoint, handler);
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.core.capabilities()
    }

    async fn initialize(&self, cancel: CancellationToken) -> Result<(), MeshError> {
        self.core.initialize(cancel).await
    }

    async fn start(&self, port: Option<u16>) -> Result<(), MeshError> {
        self.core.start(port).await
    }

    async fn shutdown(&self) -> Result<(), MeshError> {
        self.core.shutdown().await
    }
}

#[async_trait]
impl Agent for BaseAgent {
    /// Delegates to the wired `Discovery` backend; fails with
    /// `discovery_unavailable` if none is wired.
    async fn discover(&self, filter: ServiceFilter) -> Result<Vec<ServiceInfo>, MeshError> {
        let discovery = self.discovery.lock().clone();
        match discovery {
            Some(discovery) => discovery.discover(filter).await,
            None => Err(MeshError::new(
                "BaseAgent::discover",
                ErrorKind::DiscoveryUnavailable,
                format!("agent {} has no discovery backend wired", self.core.name),
            )),
        }
    }
}

impl AsCore for BaseAgent {
    fn core(&self) -> &Arc<ComponentCore> {
        &self.core
    }

    fn set_discovery_if_absent(&self, discovery: Arc<dyn Discovery>) {
        self.set_discovery_if_absent(discovery);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_config::Config as MeshConfig;
    use meshkit_registry::InMemoryRegistry;

    fn test_config(name: &str, port: u16) -> MeshConfig {
        MeshConfig::defaults().with_name(name).unwrap().with_port(port).unwrap()
    }

    #[tokio::test]
    async fn discover_without_backend_fails_with_discovery_unavailable() {
        let agent = BaseAgent::new("router", "", test_config("router", 18090), Collaborators::default(), None);
        let err = agent.discover(ServiceFilter::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::DiscoveryUnavailable);
    }

    #[tokio::test]
    async fn discover_delegates_to_wired_backend() {
        let registry = Arc::new(InMemoryRegistry::new());
        let info = ServiceInfo::new(ServiceId::new(), "calculator", ComponentType::Tool, "", "127.0.0.1", 9000);
        registry.register(info.clone()).await.unwrap();

        let discovery: Arc<dyn Discovery> = registry;
        let agent = BaseAgent::new("router", "", test_config("router", 18091), Collaborators::default(), Some(discovery));

        let found = agent.discover(ServiceFilter::new().with_name("calculator")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, info.id);
    }

    #[tokio::test]
    async fn agent_registers_through_the_discovery_as_registry_bridge() {
        let registry = Arc::new(InMemoryRegistry::new());
        let discovery: Arc<dyn Discovery> = registry.clone();
        let agent = BaseAgent::new("router", "", test_config("router", 18092), Collaborators::default(), Some(discovery));

        agent.initialize(CancellationToken::new()).await.unwrap();
        let found = registry.find_service("router").await.unwrap();
        assert_eq!(found.len(), 1);
        agent.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn as_core_set_discovery_if_absent_wires_both_slots() {
        let registry = Arc::new(InMemoryRegistry::new());
        let info = ServiceInfo::new(ServiceId::new(), "calculator", ComponentType::Tool, "", "127.0.0.1", 9001);
        registry.register(info.clone()).await.unwrap();

        let agent = BaseAgent::new("router", "", test_config("router", 18093), Collaborators::default(), None);
        let discovery: Arc<dyn Discovery> = registry;
        AsCore::set_discovery_if_absent(&agent, discovery);

        assert!(agent.core().registry().is_some());
        let found = agent.discover(ServiceFilter::new().with_name("calculator")).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    /// Compile-time check only: anywhere a `Tool` is required, a `BaseAgent`
    /// is substitutable. Generic rather than `dyn Tool`/`dyn Agent`
    /// trait-object upcasting, which this workspace's declared MSRV
    /// (1.85) cannot rely on. Never invoked.
    #[allow(dead_code)]
    fn accepts_tool<T: Tool>(_tool: &T) {}
    #[allow(dead_code)]
    fn agent_satisfies_tool_bound(agent: &BaseAgent) {
        accepts_tool(agent);
    }
}
