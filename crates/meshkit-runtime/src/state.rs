//! Component lifecycle state.

/// `constructed -> Initialize (registers + starts heartbeat) -> Start
/// (serves HTTP) -> Shutdown (stops heartbeat, unregisters, closes server)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}
