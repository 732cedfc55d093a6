// Port Layer - Interfaces for external dependencies

pub mod remote;

// Re-exports
pub use remote::{cim_status_name, RemoteConnector, RemoteError, RemoteSession};
