//! In-memory mock backend: no TTL, no heartbeat, same filter semantics.
//!
//! Shipped as a first-class part of the crate, not test-only scaffolding —
//! user code and integration tests depend on it at runtime.

use crate::traits::{Discovery, Registry, ServiceFilter};
use meshkit_core::{ErrorKind, HealthStatus, MeshError, ServiceId, ServiceInfo};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryRegistry {
    store: RwLock<HashMap<ServiceId, ServiceInfo>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Registry for InMemoryRegistry {
    async fn register(&self, info: ServiceInfo) -> Result<(), MeshError> {
        self.store.write().insert(info.id, info);
        Ok(())
    }

    async fn update_health(&self, id: ServiceId, status: HealthStatus) -> Result<(), MeshError> {
        let mut store = self.store.write();
        let info = store.get_mut(&id).ok_or_else(|| {
            MeshError::new(
                "InMemoryRegistry::update_health",
                ErrorKind::ServiceNotFound,
                format!("no service registered with id {id}"),
            )
        })?;
        info.health = status;
        info.touch();
        Ok(())
    }

    async fn unregister(&self, id: ServiceId) -> Result<(), MeshError> {
        self.store
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| {
                MeshError::new(
                    "InMemoryRegistry::unregister",
                    ErrorKind::ServiceNotFound,
                    format!("no service registered with id {id}"),
                )
            })
    }
}

#[async_trait::async_trait]
impl Discovery for InMemoryRegistry {
    async fn discover(&self, filter: ServiceFilter) -> Result<Vec<ServiceInfo>, MeshError> {
        Ok(self
            .store
            .read()
            .values()
            .filter(|info| filter.matches(info))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_core::{Capability, ComponentType};

    fn service(name: &str) -> ServiceInfo {
        let mut info = ServiceInfo::new(ServiceId::new(), name, ComponentType::Tool, "", "127.0.0.1", 8080);
        info.capabilities.push(Capability::new("add", "", ""));
        info
    }

    #[test]
    fn in_memory_backend_does_not_support_liveness() {
        assert!(!InMemoryRegistry::new().supports_liveness());
    }

    #[tokio::test]
    async fn register_then_unregister_returns_to_empty_state() {
        let registry = InMemoryRegistry::new();
        let info = service("calculator");
        let id = info.id;

        registry.register(info).await.unwrap();
        assert_eq!(registry.discover(ServiceFilter::new()).await.unwrap().len(), 1);

        registry.unregister(id).await.unwrap();
        assert_eq!(registry.discover(ServiceFilter::new()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn update_health_mutates_in_place() {
        let registry = InMemoryRegistry::new();
        let info = service("calculator");
        let id = info.id;
        registry.register(info).await.unwrap();

        registry.update_health(id, HealthStatus::Unhealthy).await.unwrap();
        let found = registry
            .discover(ServiceFilter::new().with_name("calculator"))
            .await
            .unwrap();
        assert_eq!(found[0].health, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn unregister_unknown_id_fails_with_service_not_found() {
        let registry = InMemoryRegistry::new();
        let err = registry.unregister(ServiceId::new()).await.unwrap_err();
        assert_eq!(err.kind, meshkit_core::ErrorKind::ServiceNotFound);
    }

    #[tokio::test]
    async fn discover_returns_subset_matching_every_clause() {
        let registry = InMemoryRegistry::new();
        let mut calculator = service("calculator");
        calculator.capabilities.push(Capability::new("subtract", "", ""));
        calculator.metadata.insert("region".into(), "us-west".into());
        let mut converter = service("converter");
        converter.capabilities = vec![Capability::new("convert", "", "")];
        converter.metadata.insert("region".into(), "us-east".into());

        registry.register(calculator).await.unwrap();
        registry.register(converter).await.unwrap();

        let filter = ServiceFilter::new()
            .with_kind(ComponentType::Tool)
            .with_capability("add")
            .with_metadata("region", "us-west");
        let found = registry.discover(filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "calculator");
    }
}
