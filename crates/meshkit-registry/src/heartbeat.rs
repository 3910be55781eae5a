//! The cancellation-driven periodic liveness refresh task.
//!
//! Started only for registry backends that support liveness refresh; for
//! the in-memory mock it is elided — callers decide that by simply not
//! spawning a heartbeat for `InMemoryRegistry`.

use crate::traits::Registry;
use meshkit_core::ServiceInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BACKOFF_FLOOR: Duration = Duration::from_secs(30);
const BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Spawn the heartbeat task bound to `cancel`. Ticks every `interval`
/// (typically TTL/3) re-writing the primary record with a fresh
/// `last_seen` and the same TTL. Transient failures are logged and
/// retried at the next tick; sustained failures back off from 30s,
/// doubling, capped at 300s, and resume the regular interval once a
/// refresh succeeds again.
pub fn spawn_heartbeat(
    registry: Arc<dyn Registry>,
    mut info: ServiceInfo,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff: Option<Duration> = None;

        loop {
            let sleep_for = backoff.unwrap_or(interval);
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(service = %info.name, "heartbeat cancelled");
                    return;
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }

            info.touch();
            match registry.register(info.clone()).await {
                Ok(()) => {
                    if backoff.is_some() {
                        tracing::info!(service = %info.name, "heartbeat recovered, resuming regular interval");
                    }
                    backoff = None;
                    meshkit_core::metrics::emit_counter(
                        "meshkit.heartbeat.success",
                        1,
                        &[("service", info.name.as_str())],
                    );
                }
                Err(err) => {
                    tracing::warn!(service = %info.name, error = %err, "heartbeat refresh failed, will retry");
                    meshkit_core::metrics::emit_counter(
                        "meshkit.heartbeat.failure",
                        1,
                        &[("service", info.name.as_str())],
                    );
                    backoff = Some(next_backoff(backoff));
                }
            }
        }
    })
}

fn next_backoff(current: Option<Duration>) -> Duration {
    match current {
        None => BACKOFF_FLOOR,
        Some(d) => std::cmp::min(d * 2, BACKOFF_CAP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps_at_300s() {
        let mut backoff = None;
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(30)));
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(60)));
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(120)));
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(240)));
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(300)));
        backoff = Some(next_backoff(backoff));
        assert_eq!(backoff, Some(Duration::from_secs(300)));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_stops_promptly_on_cancellation() {
        use crate::memory::InMemoryRegistry;
        use meshkit_core::{ComponentType, ServiceId};

        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let info = ServiceInfo::new(ServiceId::new(), "svc", ComponentType::Tool, "", "127.0.0.1", 8080);
        let cancel = CancellationToken::new();

        let handle = spawn_heartbeat(registry, info, Duration::from_secs(10), cancel.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
