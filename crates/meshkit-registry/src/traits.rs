//! Registry / Discovery contracts and filter semantics.

use meshkit_core::{ComponentType, HealthStatus, MeshError, ServiceId, ServiceInfo};
use std::collections::HashMap;

/// A filter applied by [`Discovery::discover`]. All present clauses are
/// AND-combined; absent clauses are ignored.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilter {
    pub kind: Option<ComponentType>,
    pub name: Option<String>,
    pub capabilities: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub health_status: Option<HealthStatus>,
}

impl ServiceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: ComponentType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health_status = Some(health);
        self
    }

    /// Whether `info` satisfies every clause present in this filter.
    pub fn matches(&self, info: &ServiceInfo) -> bool {
        if let Some(kind) = self.kind {
            if info.kind != kind {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &info.name != name {
                return false;
            }
        }
        if !self.capabilities.is_empty() {
            let present: std::collections::HashSet<&str> =
                info.capabilities.iter().map(|c| c.name.as_str()).collect();
            if !self.capabilities.iter().all(|c| present.contains(c.as_str())) {
                return false;
            }
        }
        if !self.metadata.is_empty() {
            for (key, value) in &self.metadata {
                let matches = match info.metadata.get(key) {
                    Some(meshkit_core::MetadataValue::String(s)) => s == value,
                    Some(meshkit_core::MetadataValue::Number(n)) => {
                        value.parse::<f64>().map(|v| v == *n).unwrap_or(false)
                    }
                    Some(meshkit_core::MetadataValue::Bool(b)) => {
                        value.parse::<bool>().map(|v| v == *b).unwrap_or(false)
                    }
                    None => false,
                };
                if !matches {
                    return false;
                }
            }
        }
        if let Some(health) = self.health_status {
            if info.health != health {
                return false;
            }
        }
        true
    }
}

/// For Tools: publish and refresh a component's presence.
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Insert or replace the record; sets an expiry equal to the backend's
    /// TTL.
    async fn register(&self, info: ServiceInfo) -> Result<(), MeshError>;

    /// Read, mutate, and rewrite the record under the same expiry.
    async fn update_health(&self, id: ServiceId, status: HealthStatus) -> Result<(), MeshError>;

    /// Remove the record and all associated indexes.
    async fn unregister(&self, id: ServiceId) -> Result<(), MeshError>;

    /// Whether this backend supports periodic liveness refresh. `false`
    /// for mocks with no TTL concept (e.g. [`crate::memory::InMemoryRegistry`]) —
    /// the heartbeat task is only ever spawned when this returns `true`.
    fn supports_liveness(&self) -> bool {
        false
    }
}

/// For Agents: Registry extended with filtered lookup.
#[async_trait::async_trait]
pub trait Discovery: Registry {
    /// Return live, matching records.
    async fn discover(&self, filter: ServiceFilter) -> Result<Vec<ServiceInfo>, MeshError>;

    /// Sugar over `discover` with a pre-set name filter.
    async fn find_service(&self, name: &str) -> Result<Vec<ServiceInfo>, MeshError> {
        self.discover(ServiceFilter::new().with_name(name)).await
    }

    /// Sugar over `discover` with a pre-set capability filter.
    async fn find_by_capability(&self, capability: &str) -> Result<Vec<ServiceInfo>, MeshError> {
        self.discover(ServiceFilter::new().with_capability(capability)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_core::Capability;

    fn service(name: &str, capability: &str, region: &str) -> ServiceInfo {
        let mut info = ServiceInfo::new(
            ServiceId::new(),
            name,
            ComponentType::Tool,
            "",
            "127.0.0.1",
            8080,
        );
        info.capabilities.push(Capability::new(capability, "", ""));
        info.metadata.insert("region".into(), region.into());
        info
    }

    #[test]
    fn filter_ands_every_present_clause() {
        let calculator = service("calculator", "add", "us-west");
        let converter = service("converter", "convert", "us-east");

        let filter = ServiceFilter::new()
            .with_kind(ComponentType::Tool)
            .with_capability("add")
            .with_metadata("region", "us-west");

        assert!(filter.matches(&calculator));
        assert!(!filter.matches(&converter));
    }

    #[test]
    fn metadata_filter_excludes_when_key_absent() {
        let info = service("calculator", "add", "us-west");
        let filter = ServiceFilter::new().with_metadata("zone", "a");
        assert!(!filter.matches(&info));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let info = service("calculator", "add", "us-west");
        assert!(ServiceFilter::new().matches(&info));
    }
}
