//! Crate-wide structured error type.
//!
//! Every error crossing a public MeshKit boundary is a [`MeshError`]: it
//! carries the operation that failed (`op`), a fixed [`ErrorKind`], a
//! human-readable `message`, and an optional wrapped cause. The cause
//! chain is traversable via [`std::error::Error::source`], and
//! [`MeshError::is_kind`] / [`MeshError::find_kind`] give the "is/as"
//! equivalents callers need without inventing a parallel mechanism.

use std::fmt;
use thiserror::Error;

/// The fixed, public set of error kinds. `#[non_exhaustive]` so the
/// taxonomy can grow without a semver break. `thiserror` derives the
/// wire-stable `snake_case` `Display` every kind needs for logs and HTTP
/// bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    // identity
    #[error("agent_not_found")]
    AgentNotFound,
    #[error("agent_not_ready")]
    AgentNotReady,
    #[error("agent_already_exists")]
    AgentAlreadyExists,
    // capability
    #[error("capability_not_found")]
    CapabilityNotFound,
    #[error("capability_not_enabled")]
    CapabilityNotEnabled,
    // discovery
    #[error("service_not_found")]
    ServiceNotFound,
    #[error("discovery_unavailable")]
    DiscoveryUnavailable,
    // configuration
    #[error("invalid_configuration")]
    InvalidConfiguration,
    #[error("missing_configuration")]
    MissingConfiguration,
    #[error("port_out_of_range")]
    PortOutOfRange,
    // state
    #[error("already_started")]
    AlreadyStarted,
    #[error("not_initialized")]
    NotInitialized,
    #[error("already_registered")]
    AlreadyRegistered,
    // operation
    #[error("timeout")]
    Timeout,
    #[error("context_canceled")]
    ContextCanceled,
    #[error("max_retries_exceeded")]
    MaxRetriesExceeded,
    // network
    #[error("connection_failed")]
    ConnectionFailed,
    #[error("request_failed")]
    RequestFailed,
    // resilience
    #[error("circuit_breaker_open")]
    CircuitBreakerOpen,
    // ai
    #[error("ai_operation_failed")]
    AiOperationFailed,
}

impl ErrorKind {
    /// Whether an operation that failed with this kind is worth retrying.
    fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::ConnectionFailed
                | ErrorKind::RequestFailed
                | ErrorKind::DiscoveryUnavailable
                | ErrorKind::MaxRetriesExceeded
        )
    }

    fn is_not_found(self) -> bool {
        matches!(
            self,
            ErrorKind::AgentNotFound | ErrorKind::CapabilityNotFound | ErrorKind::ServiceNotFound
        )
    }

    fn is_configuration_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidConfiguration
                | ErrorKind::MissingConfiguration
                | ErrorKind::PortOutOfRange
        )
    }

    fn is_state_error(self) -> bool {
        matches!(
            self,
            ErrorKind::AlreadyStarted | ErrorKind::NotInitialized | ErrorKind::AlreadyRegistered
        )
    }
}

/// The single structured error type used across every MeshKit crate.
#[derive(Debug)]
pub struct MeshError {
    pub op: String,
    pub kind: ErrorKind,
    pub message: String,
    source: Option<Box<MeshError>>,
}

impl MeshError {
    pub fn new(op: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a wrapped cause, building the unwrap chain.
    pub fn with_source(mut self, cause: MeshError) -> Self {
        self.source = Some(Box::new(cause));
        self
    }

    /// True if `self` or any wrapped cause carries `kind`.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind || self.source.as_deref().is_some_and(|s| s.is_kind(kind))
    }

    /// Returns the outermost `MeshError` in the chain whose kind matches a
    /// predicate — the "as" half of an is/as pair. Since every node in the
    /// chain is already a `MeshError`, "as FrameworkError" degenerates to
    /// "self", which this returns for symmetry with callers that walk from
    /// an opaque `&dyn Error`.
    pub fn find_kind(&self, kind: ErrorKind) -> Option<&MeshError> {
        if self.kind == kind {
            Some(self)
        } else {
            self.source.as_deref().and_then(|s| s.find_kind(kind))
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable() || self.source.as_deref().is_some_and(MeshError::is_retryable)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind.is_not_found() || self.source.as_deref().is_some_and(MeshError::is_not_found)
    }

    pub fn is_configuration_error(&self) -> bool {
        self.kind.is_configuration_error()
            || self
                .source
                .as_deref()
                .is_some_and(MeshError::is_configuration_error)
    }

    pub fn is_state_error(&self) -> bool {
        self.kind.is_state_error()
            || self.source.as_deref().is_some_and(MeshError::is_state_error)
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.op, self.message, self.kind)
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Build a `MeshError` wrapping an existing cause in one call.
pub fn wrap(
    op: impl Into<String>,
    kind: ErrorKind,
    message: impl Into<String>,
    cause: MeshError,
) -> MeshError {
    MeshError::new(op, kind, message).with_source(cause)
}

/// Convenience result alias using [`error_stack::Report`] for call sites
/// that want to attach human-readable context as the error propagates.
pub type MeshResult<T> = Result<T, error_stack::Report<MeshError>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_kind_finds_outer_and_wrapped() {
        let inner = MeshError::new("redis.get", ErrorKind::ConnectionFailed, "refused");
        let outer = MeshError::new("registry.register", ErrorKind::DiscoveryUnavailable, "backend down")
            .with_source(inner);

        assert!(outer.is_kind(ErrorKind::DiscoveryUnavailable));
        assert!(outer.is_kind(ErrorKind::ConnectionFailed));
        assert!(!outer.is_kind(ErrorKind::Timeout));
    }

    #[test]
    fn classifiers_walk_the_chain() {
        let inner = MeshError::new("tcp.dial", ErrorKind::ConnectionFailed, "refused");
        let outer = MeshError::new("heartbeat.tick", ErrorKind::RequestFailed, "retry")
            .with_source(inner);

        assert!(outer.is_retryable());
        assert!(!outer.is_not_found());
        assert!(!outer.is_configuration_error());
        assert!(!outer.is_state_error());
    }

    #[test]
    fn find_kind_returns_matching_node() {
        let inner = MeshError::new("op", ErrorKind::PortOutOfRange, "port 99999");
        let outer = MeshError::new("validate", ErrorKind::InvalidConfiguration, "bad config")
            .with_source(inner);

        let found = outer.find_kind(ErrorKind::PortOutOfRange).unwrap();
        assert_eq!(found.message, "port 99999");
    }

    #[test]
    fn display_includes_op_message_kind() {
        let err = MeshError::new("initialize", ErrorKind::AlreadyStarted, "already running");
        assert_eq!(err.to_string(), "initialize: already running (already_started)");
    }

    #[test]
    fn std_error_source_exposes_cause() {
        use std::error::Error as _;
        let inner = MeshError::new("a", ErrorKind::Timeout, "slow");
        let outer = MeshError::new("b", ErrorKind::RequestFailed, "failed").with_source(inner);
        assert!(outer.source().is_some());
    }
}
