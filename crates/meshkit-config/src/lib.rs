// resolver module: the three-layer config merge (defaults -> env -> options) and validation
pub mod resolver;

// address module: bind/advertise address resolution, Kubernetes Service DNS, metadata bag
pub mod address;

pub use address::{build_metadata, resolve_address};
pub use resolver::{Config, Options};
