//! Three-layer configuration merge: defaults -> environment -> explicit
//! options, plus validation.
//!
//! Precedence is deliberately asymmetric for the redis URL: the
//! environment loader prefers the `GOMIND_`-prefixed variable, while
//! [`Config::with_discovery`] (an explicit option) prefers the generic
//! `REDIS_URL`. This mirrors the originating framework's own tests and
//! must not be unified.

use config::{Config as RawConfig, File, FileFormat};
use meshkit_core::{ErrorKind, MeshError};
use regex::Regex;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub name: String,
    pub id: Option<String>,
    pub port: u16,
    pub bind_address: String,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub cors_enabled: bool,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub provider: String,
    pub redis_url: Option<String>,
    /// True once `redis_url` was set by an explicit option rather than by
    /// the environment loader — protects it from being re-derived by
    /// `with_discovery`'s generic-env-wins lookup.
    pub(crate) redis_url_explicit: bool,
    pub ttl_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub mock: bool,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: Option<String>,
    pub mock: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub circuit_breaker_enabled: bool,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone)]
pub struct DevelopmentConfig {
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct KubernetesConfig {
    pub enabled: bool,
    pub namespace: String,
    pub service_name: Option<String>,
    pub service_port: Option<u16>,
}

/// The fully-merged, validated configuration tree.
#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub ai: AiConfig,
    pub telemetry: TelemetryConfig,
    pub memory: MemoryConfig,
    pub resilience: ResilienceConfig,
    pub logging: LoggingConfig,
    pub development: DevelopmentConfig,
    pub kubernetes: KubernetesConfig,
}

const KUBERNETES_INDICATOR: &str = "KUBERNETES_SERVICE_HOST";

impl Config {
    /// Layer 1: hard-coded typed defaults.
    pub fn defaults() -> Self {
        Self {
            core: CoreConfig {
                name: String::new(),
                id: None,
                port: 8080,
                bind_address: "127.0.0.1".to_string(),
            },
            http: HttpConfig {
                cors_enabled: false,
                read_timeout: Duration::from_secs(30),
                write_timeout: Duration::from_secs(30),
                idle_timeout: Duration::from_secs(120),
                shutdown_timeout: Duration::from_secs(10),
            },
            discovery: DiscoveryConfig {
                enabled: false,
                provider: "redis".to_string(),
                redis_url: None,
                redis_url_explicit: false,
                ttl_secs: 30,
                heartbeat_interval_secs: 10,
                mock: false,
            },
            ai: AiConfig {
                enabled: false,
                provider: "openai".to_string(),
                api_key: None,
                mock: false,
            },
            telemetry: TelemetryConfig {
                enabled: false,
                endpoint: None,
                service_name: "meshkit".to_string(),
            },
            memory: MemoryConfig {
                enabled: false,
                provider: "in-memory".to_string(),
            },
            resilience: ResilienceConfig {
                circuit_breaker_enabled: false,
                failure_threshold: 5,
                reset_timeout: Duration::from_secs(30),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Text,
                output: LogOutput::Stdout,
            },
            development: DevelopmentConfig { dev_mode: false },
            kubernetes: KubernetesConfig::default(),
        }
    }

    /// Layer 2: environment. Reads `GOMIND_*`-prefixed names as the
    /// framework namespace, falling back to the handful of well-known
    /// generic names this lists — but only when the prefixed variant
    /// is unset.
    pub fn apply_environment(&mut self) {
        self.detect_environment();

        if let Ok(v) = env::var("GOMIND_AGENT_NAME") {
            self.core.name = v;
        }
        if let Ok(v) = env::var("GOMIND_AGENT_ID") {
            self.core.id = Some(v);
        }
        if let Ok(v) = env::var("GOMIND_PORT") {
            if let Ok(p) = v.parse() {
                self.core.port = p;
            }
        }
        if let Ok(v) = env::var("GOMIND_ADDRESS") {
            self.core.bind_address = v;
        }
        if let Ok(v) = env::var("GOMIND_NAMESPACE") {
            self.kubernetes.namespace = v;
        }

        if let Ok(v) = env::var("GOMIND_DISCOVERY_ENABLED") {
            self.discovery.enabled = parse_bool(&v);
        }
        if let Ok(v) = env::var("GOMIND_DISCOVERY_PROVIDER") {
            self.discovery.provider = v;
        }
        // Framework-prefixed wins over generic here — see module docs.
        if let Ok(v) = env::var("GOMIND_REDIS_URL") {
            self.discovery.redis_url = Some(v);
        } else if let Ok(v) = env::var("REDIS_URL") {
            self.discovery.redis_url = Some(v);
        }
        if let Ok(v) = env::var("GOMIND_MOCK_DISCOVERY") {
            self.discovery.mock = parse_bool(&v);
        }

        if let Ok(v) = env::var("GOMIND_AI_ENABLED") {
            self.ai.enabled = parse_bool(&v);
        }
        if let Ok(v) = env::var("GOMIND_AI_PROVIDER") {
            self.ai.provider = v;
        }
        if let Ok(v) = env::var("GOMIND_AI_API_KEY") {
            self.ai.api_key = Some(v);
        } else if let Ok(v) = env::var("OPENAI_API_KEY") {
            self.ai.api_key = Some(v);
        }
        if let Ok(v) = env::var("GOMIND_MOCK_AI") {
            self.ai.mock = parse_bool(&v);
        }

        if let Ok(v) = env::var("GOMIND_TELEMETRY_ENABLED") {
            self.telemetry.enabled = parse_bool(&v);
        }
        if let Ok(v) = env::var("GOMIND_TELEMETRY_ENDPOINT") {
            self.telemetry.endpoint = Some(v);
        } else if let Ok(v) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.telemetry.endpoint = Some(v);
        }
        if let Ok(v) = env::var("GOMIND_TELEMETRY_SERVICE_NAME") {
            self.telemetry.service_name = v;
        } else if let Ok(v) = env::var("OTEL_SERVICE_NAME") {
            self.telemetry.service_name = v;
        }

        if let Ok(v) = env::var("GOMIND_MEMORY_ENABLED") {
            self.memory.enabled = parse_bool(&v);
        }

        if let Ok(v) = env::var("GOMIND_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = env::var("GOMIND_LOG_FORMAT") {
            self.logging.format = if v.eq_ignore_ascii_case("json") {
                LogFormat::Json
            } else {
                LogFormat::Text
            };
        }

        if let Ok(v) = env::var("GOMIND_K8S_NAMESPACE") {
            self.kubernetes.namespace = v;
        }
        if let Ok(v) = env::var("GOMIND_K8S_SERVICE_NAME") {
            self.kubernetes.service_name = Some(v);
        }
        if let Ok(v) = env::var("GOMIND_K8S_SERVICE_PORT") {
            if let Ok(p) = v.parse() {
                self.kubernetes.service_port = Some(p);
            }
        }
    }

    /// Environment detection, run as the first step of [`apply_environment`]
    /// (environment detection).
    fn detect_environment(&mut self) {
        if env::var(KUBERNETES_INDICATOR).is_ok() {
            self.kubernetes.enabled = true;
            self.core.bind_address = "0.0.0.0".to_string();
            self.discovery.enabled = true;
            self.logging.format = LogFormat::Json;
        } else {
            self.core.bind_address = "127.0.0.1".to_string();
            if env::var("GOMIND_DEV_MODE").is_err() {
                self.development.dev_mode = true;
                self.logging.format = LogFormat::Text;
            }
        }
    }

    /// Layer 3: apply explicit, builder-style options in order. Each may
    /// fail with a configuration error.
    pub fn with_options(mut self, options: Options) -> Result<Self, MeshError> {
        for option in options.0 {
            option(&mut self)?;
        }
        Ok(self)
    }

    /// After merge, enforce every validation rule.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.core.name.is_empty() {
            return Err(MeshError::new(
                "Config::validate",
                ErrorKind::MissingConfiguration,
                "component name must not be empty",
            ));
        }
        if self.core.port == 0 || self.core.port > 65535 {
            return Err(MeshError::new(
                "Config::validate",
                ErrorKind::PortOutOfRange,
                format!("port {} outside 1..65535", self.core.port),
            ));
        }
        if self.ai.enabled && !self.ai.mock && self.ai.api_key.is_none() {
            return Err(MeshError::new(
                "Config::validate",
                ErrorKind::MissingConfiguration,
                "AI enabled but no API key configured",
            ));
        }
        if self.telemetry.enabled && self.telemetry.endpoint.is_none() {
            return Err(MeshError::new(
                "Config::validate",
                ErrorKind::MissingConfiguration,
                "telemetry enabled but no endpoint configured",
            ));
        }
        if self.discovery.enabled
            && self.discovery.provider == "redis"
            && !self.discovery.mock
            && self.discovery.redis_url.is_none()
        {
            return Err(MeshError::new(
                "Config::validate",
                ErrorKind::MissingConfiguration,
                "discovery enabled with redis provider but no redis URL configured",
            ));
        }
        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Result<Self, MeshError> {
        if port == 0 || port > 65535 {
            return Err(MeshError::new(
                "Config::with_port",
                ErrorKind::PortOutOfRange,
                format!("port {port} outside 1..65535"),
            ));
        }
        self.core.port = port;
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, MeshError> {
        let name = name.into();
        if name.is_empty() {
            return Err(MeshError::new(
                "Config::with_name",
                ErrorKind::MissingConfiguration,
                "component name must not be empty",
            ));
        }
        self.core.name = name;
        Ok(self)
    }

    /// Enable discovery with the given provider. When the provider is
    /// `"redis"` and no explicit redis URL option has been applied yet,
    /// re-derives `redis_url` preferring the **generic** `REDIS_URL`
    /// variable over `GOMIND_REDIS_URL` — the deliberate asymmetry this
    /// module calls out. This intentionally overrides whatever the environment
    /// loader (prefixed-wins) already computed.
    pub fn with_discovery(mut self, enabled: bool, provider: impl Into<String>) -> Result<Self, MeshError> {
        self.discovery.enabled = enabled;
        self.discovery.provider = provider.into();
        if enabled && self.discovery.provider == "redis" && !self.discovery.redis_url_explicit {
            if let Ok(v) = env::var("REDIS_URL") {
                self.discovery.redis_url = Some(v);
            } else if let Ok(v) = env::var("GOMIND_REDIS_URL") {
                self.discovery.redis_url = Some(v);
            }
        }
        Ok(self)
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Result<Self, MeshError> {
        self.discovery.redis_url = Some(url.into());
        self.discovery.redis_url_explicit = true;
        Ok(self)
    }

    pub fn with_ai(mut self, enabled: bool, api_key: Option<String>) -> Result<Self, MeshError> {
        self.ai.enabled = enabled;
        self.ai.api_key = api_key;
        Ok(self)
    }

    pub fn with_telemetry(mut self, enabled: bool, endpoint: Option<String>) -> Result<Self, MeshError> {
        self.telemetry.enabled = enabled;
        self.telemetry.endpoint = endpoint;
        Ok(self)
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Result<Self, MeshError> {
        self.development.dev_mode = dev_mode;
        Ok(self)
    }

    /// Load a config file. `.json` is parsed via the `config` crate;
    /// `.yaml`/`.yml` are detected but explicitly rejected — that
    /// rejection is permanent, not a missing
    /// feature. A relative path is resolved against the current working
    /// directory, and `${VAR}` / `$VAR` references are substituted from
    /// the process environment before parsing.
    pub fn load_file(path: &str) -> Result<serde_json::Value, MeshError> {
        let resolved = std::path::Path::new(path);
        let resolved = if resolved.is_relative() {
            std::env::current_dir()
                .map_err(|e| {
                    MeshError::new(
                        "Config::load_file",
                        ErrorKind::InvalidConfiguration,
                        format!("cannot resolve working directory: {e}"),
                    )
                })?
                .join(resolved)
        } else {
            resolved.to_path_buf()
        };

        match resolved.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                return Err(MeshError::new(
                    "Config::load_file",
                    ErrorKind::InvalidConfiguration,
                    "YAML config files are recognized but not supported by the core",
                ));
            }
            Some("json") => {}
            _ => {
                return Err(MeshError::new(
                    "Config::load_file",
                    ErrorKind::InvalidConfiguration,
                    "unrecognized config file extension",
                ));
            }
        }

        let raw = std::fs::read_to_string(&resolved).map_err(|e| {
            MeshError::new(
                "Config::load_file",
                ErrorKind::InvalidConfiguration,
                format!("cannot read {}: {e}", resolved.display()),
            )
        })?;
        let substituted = substitute_env_vars(&raw);

        let loaded = RawConfig::builder()
            .add_source(File::from_str(&substituted, FileFormat::Json))
            .build()
            .map_err(|e| {
                MeshError::new(
                    "Config::load_file",
                    ErrorKind::InvalidConfiguration,
                    format!("invalid JSON in {}: {e}", resolved.display()),
                )
            })?;

        loaded.try_deserialize().map_err(|e| {
            MeshError::new(
                "Config::load_file",
                ErrorKind::InvalidConfiguration,
                format!("invalid JSON in {}: {e}", resolved.display()),
            )
        })
    }

    /// Build the fully merged and validated config: defaults -> env ->
    /// options -> validate (the three-layer pipeline).
    pub fn build(options: Options) -> Result<Self, MeshError> {
        let mut config = Config::defaults();
        config.apply_environment();
        let config = config.with_options(options)?;
        config.validate()?;
        Ok(config)
    }
}

/// Substitute `${VAR}` and `$VAR` references in `content` with values from
/// the process environment, leaving unknown references untouched.
fn substitute_env_vars(content: &str) -> String {
    let braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let substituted = braced.replace_all(content, |caps: &regex::Captures| {
        env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    let bare = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").unwrap();
    bare.replace_all(&substituted, |caps: &regex::Captures| {
        env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

fn parse_bool(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

type ConfigOption = Box<dyn FnOnce(&mut Config) -> Result<(), MeshError>>;

/// A sequence of builder-style mutators applied last, in order, each of
/// which may fail with a configuration error.
#[derive(Default)]
pub struct Options(Vec<ConfigOption>);

impl Options {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(mut self, option: impl FnOnce(&mut Config) -> Result<(), MeshError> + 'static) -> Self {
        self.0.push(Box::new(option));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable tests mutate process-global state; serialize
    // them so parallel test execution doesn't race.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "GOMIND_PORT",
            "GOMIND_REDIS_URL",
            "REDIS_URL",
            "GOMIND_DEV_MODE",
            "KUBERNETES_SERVICE_HOST",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn explicit_port_option_beats_env_var() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("GOMIND_PORT", "9090");

        let mut config = Config::defaults();
        config.apply_environment();
        assert_eq!(config.core.port, 9090);

        let config = config.with_port(8080).unwrap();
        assert_eq!(config.core.port, 8080);
        clear_env();
    }

    #[test]
    fn with_discovery_prefers_generic_redis_url_over_prefixed() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("REDIS_URL", "redis://primary:6379");
        env::set_var("GOMIND_REDIS_URL", "redis://secondary:6379");

        let mut config = Config::defaults();
        config.apply_environment();
        // env loader itself prefers the framework-prefixed variant.
        assert_eq!(config.discovery.redis_url.as_deref(), Some("redis://secondary:6379"));

        let config = config.with_discovery(true, "redis").unwrap();
        assert_eq!(config.discovery.redis_url.as_deref(), Some("redis://primary:6379"));
        clear_env();
    }

    #[test]
    fn validate_rejects_empty_name() {
        let config = Config::defaults();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingConfiguration);
    }

    #[test]
    fn validate_rejects_out_of_range_port() {
        let mut config = Config::defaults();
        config.core.name = "svc".to_string();
        config.core.port = 0;
        assert_eq!(config.validate().unwrap_err().kind, ErrorKind::PortOutOfRange);
    }

    #[test]
    fn with_port_boundary_values() {
        let base = Config::defaults().with_name("svc").unwrap();
        assert!(base.clone().with_port(1).is_ok());
        assert!(base.clone().with_port(65535).is_ok());
        assert!(base.clone().with_port(0).is_err());
    }

    #[test]
    fn dev_mode_enabled_by_default_outside_kubernetes() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        let mut config = Config::defaults();
        config.apply_environment();
        assert!(config.development.dev_mode);
        assert_eq!(config.logging.format, LogFormat::Text);
        clear_env();
    }

    #[test]
    fn kubernetes_indicator_sets_discovery_and_json_logs() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("KUBERNETES_SERVICE_HOST", "10.0.0.1");
        let mut config = Config::defaults();
        config.apply_environment();
        assert!(config.discovery.enabled);
        assert_eq!(config.core.bind_address, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        clear_env();
    }
}
