//! `Framework`: merges options into a component's config, injects a
//! discovery backend, and drives the component's lifecycle.

use meshkit_config::{Config, Options};
use meshkit_core::{ErrorKind, MeshError};
use meshkit_registry::{Discovery, InMemoryRegistry, Registry};
use meshkit_runtime::AsCore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Orchestrates a single component (`BaseTool` or `BaseAgent`, anything
/// implementing [`AsCore`]) from construction through a signal-triggered
/// shutdown.
pub struct Framework<C: AsCore> {
    component: Arc<C>,
    config: Config,
}

impl<C: AsCore> Framework<C> {
    /// Merges `options` onto the component's already-resolved config
    /// then — unless the component already carries a
    /// registry/discovery backend — constructs and injects the one the
    /// merged config names.
    pub fn new(component: Arc<C>, options: Options) -> Result<Self, MeshError> {
        let config = component.core().config.clone().with_options(options)?;
        config.validate()?;

        if config.discovery.enabled && component.core().registry().is_none() {
            let backend = build_backend(&config)?;
            component.core().set_registry_if_absent(backend.as_registry());
            component.set_discovery_if_absent(backend.as_discovery());
        }

        Ok(Self { component, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Calls `initialize`, mounts CORS if configured, starts the HTTP
    /// server, and on `SIGINT`/`SIGTERM` or an externally-triggered
    /// cancellation, runs `shutdown`.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MeshError> {
        self.component.core().initialize(cancel.clone()).await?;

        if self.config.http.cors_enabled {
            self.component.core().enable_cors();
        }

        let signal_cancel = cancel.clone();
        let signal_task = tokio::spawn(async move {
            crate::signal::shutdown_signal().await;
            signal_cancel.cancel();
        });

        let serve_result = self.component.core().start(None).await;
        signal_task.abort();

        let shutdown_result = self.component.core().shutdown().await;

        serve_result?;
        shutdown_result
    }
}

/// The concrete backend the merged config names, held as its concrete
/// type so it can be exposed as two distinct trait objects — `Registry`
/// for `ComponentCore`'s slot, `Discovery` for an agent's — without ever
/// coercing one `dyn` trait object into another (trait-object upcasting
/// is stable only from Rust 1.86; this workspace targets 1.85).
enum Backend {
    Memory(Arc<InMemoryRegistry>),
    #[cfg(feature = "redis-backend")]
    Redis(Arc<meshkit_registry::RedisRegistry>),
}

impl Backend {
    fn as_registry(&self) -> Arc<dyn Registry> {
        match self {
            Backend::Memory(backend) => backend.clone(),
            #[cfg(feature = "redis-backend")]
            Backend::Redis(backend) => backend.clone(),
        }
    }

    fn as_discovery(&self) -> Arc<dyn Discovery> {
        match self {
            Backend::Memory(backend) => backend.clone(),
            #[cfg(feature = "redis-backend")]
            Backend::Redis(backend) => backend.clone(),
        }
    }
}

fn build_backend(config: &Config) -> Result<Backend, MeshError> {
    if config.discovery.mock || config.discovery.provider != "redis" {
        return Ok(Backend::Memory(Arc::new(InMemoryRegistry::new())));
    }

    #[cfg(feature = "redis-backend")]
    {
        let url = config.discovery.redis_url.clone().ok_or_else(|| {
            MeshError::new(
                "Framework::new",
                ErrorKind::MissingConfiguration,
                "discovery enabled with redis provider but no redis URL configured",
            )
        })?;
        let ttl = Duration::from_secs(config.discovery.ttl_secs.max(1));
        let heartbeat = Duration::from_secs(config.discovery.heartbeat_interval_secs.max(1));
        let registry = meshkit_registry::RedisRegistry::connect(&url, ttl, heartbeat)?;
        Ok(Backend::Redis(Arc::new(registry)))
    }

    #[cfg(not(feature = "redis-backend"))]
    {
        Err(MeshError::new(
            "Framework::new",
            ErrorKind::InvalidConfiguration,
            "discovery provider \"redis\" requires the redis-backend feature",
        ))
    }
}
