// identity module: ServiceId, ServiceInfo, Capability, health enums
pub mod identity;

// error module: the crate-wide MeshError taxonomy
pub mod error;

// logging module: Logger / ComponentAwareLogger contracts and the tracing-backed impl
pub mod logging;

// metrics module: the process-global MetricsRegistry indirection
pub mod metrics;

pub use error::{ErrorKind, MeshError, MeshResult};
pub use identity::{Capability, ComponentType, HealthStatus, ServiceId, ServiceInfo};
