//! Framework Orchestrator: the glue between a constructed `BaseTool` /
//! `BaseAgent` and a running process.
//!
//! The orchestrator owns none of the component's core logic — it merges
//! `Options` into the component's config, injects a discovery backend
//! unless the component already carries one, mounts CORS when configured,
//! and drives the component's lifecycle to a signal-triggered shutdown.
//! Everything it touches is reached through [`meshkit_runtime::AsCore`], so
//! it is agnostic to whether the underlying component is a Tool or an
//! Agent.

mod framework;
mod signal;

pub use framework::Framework;
pub use signal::shutdown_signal;
