//! Bind/advertise address resolution and the Kubernetes metadata bag.

use crate::resolver::Config;
use meshkit_core::MetadataValue;
use std::collections::HashMap;
use std::env;

/// Produce `(advertise_address, advertise_port)` for the given config.
///
/// Prefers Kubernetes Service DNS when Kubernetes mode is on and a
/// service name is configured; otherwise falls back to the configured
/// bind address and port.
pub fn resolve_address(config: &Config) -> (String, u16) {
    if config.kubernetes.enabled {
        if let Some(service_name) = &config.kubernetes.service_name {
            let namespace = if config.kubernetes.namespace.is_empty() {
                "default"
            } else {
                &config.kubernetes.namespace
            };
            let address = format!("{service_name}.{namespace}.svc.cluster.local");
            let port = config.kubernetes.service_port.unwrap_or(80);
            return (address, port);
        }
    }

    let address = if config.core.bind_address.is_empty() {
        "127.0.0.1".to_string()
    } else {
        config.core.bind_address.clone()
    };
    let port = if config.core.port == 0 { 8080 } else { config.core.port };
    (address, port)
}

/// Build the auxiliary metadata bag attached to a published `ServiceInfo`:
/// namespace always; pod name, pod namespace, service name, ports, pod
/// IP, and node name when running in Kubernetes mode.
pub fn build_metadata(config: &Config) -> HashMap<String, MetadataValue> {
    let mut metadata = HashMap::new();
    let namespace = if config.kubernetes.namespace.is_empty() {
        "default".to_string()
    } else {
        config.kubernetes.namespace.clone()
    };
    metadata.insert("namespace".to_string(), MetadataValue::String(namespace));

    if config.kubernetes.enabled {
        if let Ok(pod_name) = env::var("HOSTNAME") {
            metadata.insert("pod_name".to_string(), MetadataValue::String(pod_name));
        }
        metadata.insert(
            "pod_namespace".to_string(),
            MetadataValue::String(config.kubernetes.namespace.clone()),
        );
        if let Some(service_name) = &config.kubernetes.service_name {
            metadata.insert(
                "service_name".to_string(),
                MetadataValue::String(service_name.clone()),
            );
        }
        metadata.insert(
            "service_port".to_string(),
            MetadataValue::Number(config.kubernetes.service_port.unwrap_or(80) as f64),
        );
        metadata.insert(
            "container_port".to_string(),
            MetadataValue::Number(config.core.port as f64),
        );
        if let Ok(pod_ip) = env::var("GOMIND_K8S_POD_IP") {
            metadata.insert("pod_ip".to_string(), MetadataValue::String(pod_ip));
        }
        if let Ok(node_name) = env::var("GOMIND_K8S_NODE_NAME") {
            metadata.insert("node_name".to_string(), MetadataValue::String(node_name));
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_kubernetes_uses_configured_bind_address_and_port() {
        let mut config = Config::defaults();
        config.core.bind_address = "127.0.0.1".to_string();
        config.core.port = 9000;
        let (address, port) = resolve_address(&config);
        assert_eq!(address, "127.0.0.1");
        assert_eq!(port, 9000);
    }

    #[test]
    fn kubernetes_mode_builds_service_dns_and_defaults_port_80() {
        let mut config = Config::defaults();
        config.kubernetes.enabled = true;
        config.kubernetes.namespace = "prod".to_string();
        config.kubernetes.service_name = Some("calculator".to_string());
        config.kubernetes.service_port = None;

        let (address, port) = resolve_address(&config);
        assert_eq!(address, "calculator.prod.svc.cluster.local");
        assert_eq!(port, 80);
    }

    #[test]
    fn kubernetes_mode_honors_explicit_service_port() {
        let mut config = Config::defaults();
        config.kubernetes.enabled = true;
        config.kubernetes.namespace = "prod".to_string();
        config.kubernetes.service_name = Some("calculator".to_string());
        config.kubernetes.service_port = Some(9090);

        let (_, port) = resolve_address(&config);
        assert_eq!(port, 9090);
    }

    #[test]
    fn metadata_always_has_namespace() {
        let config = Config::defaults();
        let metadata = build_metadata(&config);
        assert!(metadata.contains_key("namespace"));
    }
}
