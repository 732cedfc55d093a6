// Central Error Type for re-raising probe outcomes

use std::time::Duration;
use thiserror::Error;

use crate::port::RemoteError;

/// A non-success probe outcome in error form
///
/// Keeps the three-way distinction of the outcome: remote cause, unexpected
/// fault, executor timeout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Unexpected fault: {0}")]
    Unexpected(String),

    #[error("Timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}
