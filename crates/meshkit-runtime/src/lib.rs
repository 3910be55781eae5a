//! Component Kernel: the Tool/Agent capability split, capability mounting,
//! and the shared HTTP mux.
//!
//! [`tool::Tool`] and [`agent::Agent`] are the two component shapes a
//! caller builds against. Both are backed by the same [`core::ComponentCore`]
//! — lifecycle state, the capability list, and the standard HTTP endpoints
//! are identical between a Tool and an Agent; only the presence of
//! `discover` differs, and that difference is enforced by the trait
//! definitions, not by a field on the shared core.

pub mod agent;
pub mod capability;
pub mod collaborators;
pub mod core;
pub mod http;
pub mod state;
pub mod tool;

pub use agent::{Agent, BaseAgent};
pub use capability::{CapabilityHandler, HealthCheck, RegisteredCapability};
pub use collaborators::{AiClient, Memory, Telemetry};
pub use core::{AsCore, Collaborators, ComponentCore};
pub use state::ComponentState;
pub use tool::{BaseTool, Tool};
