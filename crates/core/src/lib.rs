// wbemping Core - Domain Logic, Ports & the Bounded Probe Executor
// NO infrastructure dependencies (Hexagonal Architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::ProbeError;
