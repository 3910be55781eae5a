//! Structured logging contract and the `tracing`-backed production impl.
//!
//! The core never hard-codes a logging backend into component logic; it
//! programs against [`Logger`] / [`ComponentAwareLogger`] so the framework
//! orchestrator can swap implementations (or none at all — see
//! `meshkit-runtime`'s graceful-degradation rule for absent collaborators).

use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// A structured field: name plus a loosely-typed value, the shape every
/// `Logger` method accepts alongside its message.
#[derive(Debug, Clone)]
pub struct Field<'a> {
    pub key: &'a str,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{s}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl<'a> Field<'a> {
    pub fn new(key: &'a str, value: impl Into<FieldValue>) -> Self {
        Self { key, value: value.into() }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}
impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}
impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}
impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}
impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// A correlation id threaded through a request's logs, when one exists.
pub type CorrelationId<'a> = Option<&'a str>;

/// Level methods each take a message and a structured field bag.
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str, fields: &[Field<'_>]);
    fn warn(&self, msg: &str, fields: &[Field<'_>]);
    fn error(&self, msg: &str, fields: &[Field<'_>]);
    fn debug(&self, msg: &str, fields: &[Field<'_>]);

    /// Context-aware variants that include a correlation id when present.
    /// Default implementations fold the id into the field bag so backends
    /// don't have to special-case it.
    fn info_ctx(&self, msg: &str, correlation_id: CorrelationId<'_>, fields: &[Field<'_>]) {
        self.info(msg, &with_correlation(correlation_id, fields));
    }
    fn warn_ctx(&self, msg: &str, correlation_id: CorrelationId<'_>, fields: &[Field<'_>]) {
        self.warn(msg, &with_correlation(correlation_id, fields));
    }
    fn error_ctx(&self, msg: &str, correlation_id: CorrelationId<'_>, fields: &[Field<'_>]) {
        self.error(msg, &with_correlation(correlation_id, fields));
    }
    fn debug_ctx(&self, msg: &str, correlation_id: CorrelationId<'_>, fields: &[Field<'_>]) {
        self.debug(msg, &with_correlation(correlation_id, fields));
    }
}

fn with_correlation<'a>(id: CorrelationId<'a>, fields: &[Field<'a>]) -> Vec<Field<'a>> {
    let mut out = fields.to_vec();
    if let Some(id) = id {
        out.push(Field::new("correlation_id", id));
    }
    out
}

/// Returns a scoped child logger tagged with a `component` attribute, e.g.
/// `framework/core`, `tool/{name}`, `agent/{name}`.
pub trait ComponentAwareLogger: Logger {
    fn scoped(&self, component: &str) -> Arc<dyn Logger>;
}

/// Output format for [`TracingLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Output stream for [`TracingLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// Production logger over `tracing`. Emits line-delimited JSON by default
/// or a human-readable text line, honoring a minimum level and a target
/// stream — the three knobs the Configuration Resolver's `logging` group
/// exposes.
pub struct TracingLogger {
    component: Option<String>,
    min_level: Level,
}

impl TracingLogger {
    pub fn new(min_level: Level) -> Self {
        Self { component: None, min_level }
    }

    /// Install a global `tracing_subscriber` matching `format`/`output`.
    /// Call once at process startup; safe to call again in tests behind
    /// `set_default` semantics of `tracing_subscriber`.
    pub fn install(min_level: Level, format: LogFormat, output: LogOutput) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::builder()
            .with_default_directive(min_level.into())
            .from_env_lossy();

        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        match (format, output) {
            (LogFormat::Json, LogOutput::Stdout) => {
                let _ = builder.json().with_writer(std::io::stdout).try_init();
            }
            (LogFormat::Json, LogOutput::Stderr) => {
                let _ = builder.json().with_writer(std::io::stderr).try_init();
            }
            (LogFormat::Text, LogOutput::Stdout) => {
                let _ = builder.with_writer(std::io::stdout).try_init();
            }
            (LogFormat::Text, LogOutput::Stderr) => {
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        }
    }

    fn emit(&self, level: Level, msg: &str, fields: &[Field<'_>]) {
        if level > self.min_level {
            return;
        }
        let component = self.component.as_deref().unwrap_or("meshkit");
        let field_str = fields
            .iter()
            .map(|f| format!("{}={}", f.key, f.value))
            .collect::<Vec<_>>()
            .join(" ");
        match level {
            Level::ERROR => tracing::error!(component, %field_str, "{msg}"),
            Level::WARN => tracing::warn!(component, %field_str, "{msg}"),
            Level::INFO => tracing::info!(component, %field_str, "{msg}"),
            _ => tracing::debug!(component, %field_str, "{msg}"),
        }
    }
}

impl Logger for TracingLogger {
    fn info(&self, msg: &str, fields: &[Field<'_>]) {
        self.emit(Level::INFO, msg, fields);
    }
    fn warn(&self, msg: &str, fields: &[Field<'_>]) {
        self.emit(Level::WARN, msg, fields);
    }
    fn error(&self, msg: &str, fields: &[Field<'_>]) {
        self.emit(Level::ERROR, msg, fields);
    }
    fn debug(&self, msg: &str, fields: &[Field<'_>]) {
        self.emit(Level::DEBUG, msg, fields);
    }
}

impl ComponentAwareLogger for TracingLogger {
    fn scoped(&self, component: &str) -> Arc<dyn Logger> {
        Arc::new(TracingLogger {
            component: Some(component.to_string()),
            min_level: self.min_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_logger_carries_component_tag() {
        let base = TracingLogger::new(Level::INFO);
        let scoped = base.scoped("tool/calculator");
        // smoke test: logging through the scoped logger must not panic
        // even with no subscriber installed.
        scoped.info("registered", &[Field::new("capabilities", 1i64)]);
    }

    #[test]
    fn levels_below_min_are_suppressed_without_panicking() {
        let logger = TracingLogger::new(Level::WARN);
        logger.debug("should be filtered", &[]);
        logger.info("should be filtered", &[]);
        logger.warn("should pass", &[]);
    }
}
