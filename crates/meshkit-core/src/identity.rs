//! Component identity and the service record published to the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque, globally unique component identifier.
///
/// Assigned once at component construction and stable for the component's
/// entire lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(uuid::Uuid);

impl ServiceId {
    /// Generate a new, collision-resistant id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ServiceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

/// Determines which interfaces a component exposes.
///
/// A [`Tool`](crate) holds a `Registry` reference only; its static type
/// forbids discovery. An `Agent` holds a `Discovery` reference (which is
/// also a `Registry`). That split lives in `meshkit-runtime` at the trait
/// level — this enum is only the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Tool,
    Agent,
}

/// Liveness as last observed by the owning component or the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

/// A free-form primitive value used in service metadata bags.
///
/// Metadata values are either strings, numbers, or booleans — never nested
/// structures (string, number, or bool — never nested).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<u16> for MetadataValue {
    fn from(n: u16) -> Self {
        MetadataValue::Number(n as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// An advertised, HTTP-addressable unit of work.
///
/// `handler` is intentionally absent from this type: it is a property of
/// the *running* component (see `meshkit-runtime::Capability` mount logic),
/// not of the wire record. `endpoint` is resolved before the capability is
/// ever serialized, so this type never observes an empty endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub endpoint: String,
    pub input_types: Vec<String>,
    pub output_types: Vec<String>,
}

impl Capability {
    /// Build a capability, deriving the endpoint from `name` when `endpoint`
    /// is empty.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let endpoint = endpoint.into();
        let endpoint = if endpoint.is_empty() {
            format!("/api/capabilities/{name}")
        } else {
            endpoint
        };
        Self {
            name,
            description: description.into(),
            endpoint,
            input_types: Vec::new(),
            output_types: Vec::new(),
        }
    }

    pub fn with_input_types(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.input_types = types.into_iter().collect();
        self
    }

    pub fn with_output_types(mut self, types: impl IntoIterator<Item = String>) -> Self {
        self.output_types = types.into_iter().collect();
        self
    }
}

/// The record published to the registry describing a live component.
///
/// Round-trips through `serde_json` byte-for-byte (modulo map key
/// ordering) so that registry backends can store it as an opaque blob
/// under `gomind:services:{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub id: ServiceId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub description: String,
    pub address: String,
    pub port: u16,
    pub capabilities: Vec<Capability>,
    pub metadata: HashMap<String, MetadataValue>,
    pub health: HealthStatus,
    /// Wall-clock timestamp refreshed by heartbeat.
    pub last_seen: chrono::DateTime<chrono::Utc>,
}

impl ServiceInfo {
    pub fn new(
        id: ServiceId,
        name: impl Into<String>,
        kind: ComponentType,
        description: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            description: description.into(),
            address: address.into(),
            port,
            capabilities: Vec::new(),
            metadata: HashMap::new(),
            health: HealthStatus::Unknown,
            last_seen: chrono::Utc::now(),
        }
    }

    /// Advance `last_seen` to now — used by heartbeat refresh and by
    /// `update_health`.
    pub fn touch(&mut self) {
        self.last_seen = chrono::Utc::now();
    }
}

/// Deprecated alias kept for source compatibility with older callers that
/// still reference `ServiceRegistration`. New code must use
/// [`ServiceInfo`] directly.
#[deprecated(note = "use ServiceInfo")]
pub type ServiceRegistration = ServiceInfo;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_derives_endpoint_when_empty() {
        let cap = Capability::new("add", "adds two numbers", "");
        assert_eq!(cap.endpoint, "/api/capabilities/add");
    }

    #[test]
    fn capability_keeps_explicit_endpoint() {
        let cap = Capability::new("add", "adds two numbers", "/custom/add");
        assert_eq!(cap.endpoint, "/custom/add");
    }

    #[test]
    fn service_info_round_trips_through_json() {
        let id = ServiceId::new();
        let mut info = ServiceInfo::new(id, "calculator", ComponentType::Tool, "", "127.0.0.1", 8080);
        info.capabilities.push(Capability::new("add", "", ""));
        info.metadata.insert("region".into(), "us-west".into());

        let json = serde_json::to_string(&info).unwrap();
        let back: ServiceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, back);
    }

    #[test]
    fn component_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ComponentType::Tool).unwrap(), "\"tool\"");
        assert_eq!(serde_json::to_string(&ComponentType::Agent).unwrap(), "\"agent\"");
    }
}
