// Application Layer - Use Cases

pub mod probe;
pub mod worker;

// Re-exports
pub use probe::{ProbeExecutor, ProbeInput, ProbeService};
pub use worker::Worker;
