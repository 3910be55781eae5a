//! The passive component shape.
//!
//! `Tool`'s interface surface contains no operation equivalent to
//! `discover` — that omission is enforced at compile time by this trait's
//! definition, not by a runtime check.

use crate::capability::{CapabilityHandler, HealthCheck};
use crate::core::{AsCore, Collaborators, ComponentCore};
use crate::state::ComponentState;
use async_trait::async_trait;
use meshkit_config::Config;
use meshkit_core::{Capability, ComponentType, MeshError, ServiceId};
use meshkit_registry::Registry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The abstract passive-component contract. Deliberately has no `discover`
/// method — see [`crate::agent::Agent`] for the strict superset that adds it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ServiceId;
    fn name(&self) -> &str;
    fn kind(&self) -> ComponentType;

    /// Generic over `impl Into<String>`, so — unlike the rest of this
    /// trait — it opts out of object safety with `Self: Sized`. `dyn Tool`
    /// / `dyn Agent` values remain usable for every other method.
    fn register_capability(
        &self,
        name: impl Into<String> + Send,
        description: impl Into<String> + Send,
        endpoint: impl Into<String> + Send,
        handler: Option<Arc<dyn CapabilityHandler>>,
    ) where
        Self: Sized;

    fn capabilities(&self) -> Vec<Capability>;
    async fn initialize(&self, cancel: CancellationToken) -> Result<(), MeshError>;
    async fn start(&self, port: Option<u16>) -> Result<(), MeshError>;
    async fn shutdown(&self) -> Result<(), MeshError>;
}

/// Base implementation of [`Tool`]. Holds a `Registry` reference only —
/// its static type forbids discovery.
pub struct BaseTool {
    core: Arc<ComponentCore>,
}

impl BaseTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        config: Config,
        collaborators: Collaborators,
        registry: Option<Arc<dyn Registry>>,
    ) -> Self {
        Self {
            core: ComponentCore::new(name, ComponentType::Tool, description, config, collaborators, registry),
        }
    }

    pub fn state(&self) -> ComponentState {
        self.core.state()
    }

    /// Mutex-guarded append; empty `endpoint` becomes
    /// `/api/capabilities/{name}`.
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

    /// Inject a registry backend unless one is already wired — an explicit
    /// caller-supplied registry always wins.
    pub fn set_registry_if_absent(&self, registry: Arc<dyn Registry>) {
        self.core.set_registry_if_absent(registry);
    }

    pub fn core(&self) -> &Arc<ComponentCore> {
        &self.core
    }
}

#[async_trait]
impl Tool for BaseTool {
    fn id(&self) -> ServiceId {
        self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn kind(&self) -> ComponentType {
        ComponentType::Tool
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

impl AsCore for BaseTool {
    fn core(&self) -> &Arc<ComponentCore> {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_config::Config as MeshConfig;

    fn test_config(name: &str, port: u16) -> MeshConfig {
        MeshConfig::defaults().with_name(name).unwrap().with_port(port).unwrap()
    }

    #[test]
    fn register_capability_derives_endpoint_when_empty() {
        let tool = BaseTool::new("calculator", "", test_config("calculator", 18080), Collaborators::default(), None);
        tool.register_capability("add", "adds two numbers", "", None);
        let caps = tool.capabilities();
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].endpoint, "/api/capabilities/add");
    }

    #[tokio::test]
    async fn initialize_twice_fails_with_already_started() {
        let tool = BaseTool::new("calculator", "", test_config("calculator", 18081), Collaborators::default(), None);
        tool.initialize(CancellationToken::new()).await.unwrap();
        let err = tool.initialize(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind, meshkit_core::ErrorKind::AlreadyStarted);
    }

    #[tokio::test]
    async fn initialize_registers_with_wired_backend_and_shuts_down_cleanly() {
        use meshkit_registry::InMemoryRegistry;

        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let tool = BaseTool::new(
            "calculator",
            "",
            test_config("calculator", 18082),
            Collaborators::default(),
            Some(registry),
        );
        tool.initialize(CancellationToken::new()).await.unwrap();
        assert_eq!(tool.state(), ComponentState::Initialized);
        tool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn heartbeat_is_elided_for_a_backend_without_liveness_support() {
        use meshkit_registry::InMemoryRegistry;

        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let tool = BaseTool::new(
            "calculator",
            "",
            test_config("calculator", 18083),
            Collaborators::default(),
            Some(registry),
        );
        tool.initialize(CancellationToken::new()).await.unwrap();
        assert!(!tool.core().has_heartbeat());
        tool.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn heartbeat_is_started_for_a_backend_with_liveness_support() {
        use meshkit_core::HealthStatus;

        struct LiveRegistry;

        #[async_trait]
        impl Registry for LiveRegistry {
            async fn register(&self, _info: meshkit_core::ServiceInfo) -> Result<(), MeshError> {
                Ok(())
            }
            async fn update_health(&self, _id: ServiceId, _status: HealthStatus) -> Result<(), MeshError> {
                Ok(())
            }
            async fn unregister(&self, _id: ServiceId) -> Result<(), MeshError> {
                Ok(())
            }
            fn supports_liveness(&self) -> bool {
                true
            }
        }

        let registry: Arc<dyn Registry> = Arc::new(LiveRegistry);
        let tool = BaseTool::new(
            "calculator",
            "",
            test_config("calculator", 18084),
            Collaborators::default(),
            Some(registry),
        );
        tool.initialize(CancellationToken::new()).await.unwrap();
        assert!(tool.core().has_heartbeat());
        tool.shutdown().await.unwrap();
    }
}
