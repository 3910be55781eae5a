// traits module: Registry / Discovery contracts and filter semantics
pub mod traits;

// memory module: the in-memory mock backend (shipped as core, not test-only)
pub mod memory;

// heartbeat module: the cancellation-driven periodic liveness refresh task
pub mod heartbeat;

#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use heartbeat::spawn_heartbeat;
pub use memory::InMemoryRegistry;
pub use traits::{Discovery, Registry, ServiceFilter};

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisRegistry;
