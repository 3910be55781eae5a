//! Process-global metrics indirection.
//!
//! The core never depends on a concrete metrics backend (Prometheus,
//! StatsD, ...); it publishes through [`MetricsRegistry`], which an
//! optional telemetry module may attach later via [`set_metrics_registry`].
//! Until one is set, every emission is a silent no-op — never a panic, and
//! never a blocking call.

use std::sync::{Arc, OnceLock};

pub trait MetricsRegistry: Send + Sync {
    fn counter(&self, name: &str, value: u64, labels: &[(&str, &str)]);
    fn gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]);
    fn histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);
}

static REGISTRY: OnceLock<Arc<dyn MetricsRegistry>> = OnceLock::new();

/// Attach a metrics backend. Only the first call wins; later calls are
/// ignored (set-once semantics — spec's "explicit lifecycle" guidance).
/// Returns whether this call was the one that set it.
pub fn set_metrics_registry(registry: Arc<dyn MetricsRegistry>) -> bool {
    REGISTRY.set(registry).is_ok()
}

/// Fetch the currently attached backend, if any.
pub fn get_metrics_registry() -> Option<Arc<dyn MetricsRegistry>> {
    REGISTRY.get().cloned()
}

/// No-op helper for call sites that don't want to match on `Option`.
pub fn emit_counter(name: &str, value: u64, labels: &[(&str, &str)]) {
    if let Some(r) = get_metrics_registry() {
        r.counter(name, value, labels);
    }
}

pub fn emit_gauge(name: &str, value: f64, labels: &[(&str, &str)]) {
    if let Some(r) = get_metrics_registry() {
        r.gauge(name, value, labels);
    }
}

pub fn emit_histogram(name: &str, value: f64, labels: &[(&str, &str)]) {
    if let Some(r) = get_metrics_registry() {
        r.histogram(name, value, labels);
    }
}
