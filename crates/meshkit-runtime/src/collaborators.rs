//! Thin interfaces for the optional collaborators a component may carry.
//!
//! The core never implements these — concrete AI/LLM clients, memory
//! backends, and telemetry exporters are out of scope here. A
//! component with no collaborator of a given kind silently skips that
//! functionality with a warning log, never a panic.

use async_trait::async_trait;
use meshkit_core::MeshError;

/// Key/value scratch space an Agent may use to carry state across calls.
#[async_trait]
pub trait Memory: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, MeshError>;
    async fn set(&self, key: &str, value: String) -> Result<(), MeshError>;
}

/// A completion-style LLM client. Concrete providers are out of scope for
/// the core — this is the seam a caller plugs one into.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, MeshError>;
}

/// Free-form event sink for an external telemetry pipeline. Distinct from
/// [`meshkit_core::metrics::MetricsRegistry`], which carries numeric
/// counters/gauges/histograms; this carries structured span-like events.
pub trait Telemetry: Send + Sync {
    fn record_event(&self, name: &str, fields: &[(&str, &str)]);
}
