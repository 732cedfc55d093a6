// Domain Layer - Pure value types for a probe attempt

pub mod endpoint;
pub mod error;
pub mod probe;

// Re-exports
pub use endpoint::{Credentials, Endpoint, Scheme};
pub use error::DomainError;
pub use probe::{ProbeFailure, ProbeOutcome, ProbeReport, ProbeRequest};
