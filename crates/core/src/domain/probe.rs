// Probe Domain Model

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::time::Duration;

use super::endpoint::{Credentials, Endpoint};
use super::error::{DomainError, Result};
use crate::error::ProbeError;
use crate::port::RemoteError;

/// Class enumerated when the caller does not pick one
pub const DEFAULT_TEST_CLASS: &str = "CIM_ComputerSystem";

/// Immutable input of a single probe attempt
///
/// Only constructible through [`ProbeRequest::new`], so a request always
/// carries a parsed endpoint and a non-zero timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    endpoint: Endpoint,
    credentials: Credentials,
    timeout: Duration,
    test_class: String,
}

impl ProbeRequest {
    /// # Errors
    /// `DomainError::InvalidTimeout` if `timeout` is zero
    pub fn new(endpoint: Endpoint, credentials: Credentials, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(DomainError::InvalidTimeout(timeout.as_millis()));
        }
        Ok(Self {
            endpoint,
            credentials,
            timeout,
            test_class: DEFAULT_TEST_CLASS.to_string(),
        })
    }

    /// Enumerate `class_name` instead of the default test class
    pub fn with_test_class(mut self, class_name: &str) -> Result<Self> {
        let class_name = class_name.trim();
        if class_name.is_empty() {
            return Err(DomainError::ValidationError(
                "test class must not be empty".to_string(),
            ));
        }
        self.test_class = class_name.to_string();
        Ok(self)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn test_class(&self) -> &str {
        &self.test_class
    }
}

/// Cause captured by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The remote side or the protocol reported an error
    Remote(RemoteError),
    /// Anything else (panic, worker lost), with its message
    Unexpected(String),
}

impl ProbeFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Remote(err) => err.kind(),
            ProbeFailure::Unexpected(_) => "unexpected",
        }
    }
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeFailure::Remote(err) => write!(f, "{}", err),
            ProbeFailure::Unexpected(msg) => write!(f, "Unexpected fault: {}", msg),
        }
    }
}

/// Terminal result of one probe attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure(ProbeFailure),
    /// The deadline elapsed first; the real outcome is unknown
    TimedOut { elapsed: Duration },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::Failure(_) => "failure",
            ProbeOutcome::TimedOut { .. } => "timed_out",
        }
    }

    /// Re-raise the outcome as an error, keeping kind and detail
    pub fn into_result(self) -> std::result::Result<(), ProbeError> {
        match self {
            ProbeOutcome::Success => Ok(()),
            ProbeOutcome::Failure(ProbeFailure::Remote(err)) => Err(ProbeError::Remote(err)),
            ProbeOutcome::Failure(ProbeFailure::Unexpected(msg)) => {
                Err(ProbeError::Unexpected(msg))
            }
            ProbeOutcome::TimedOut { elapsed } => Err(ProbeError::TimedOut(elapsed)),
        }
    }
}

impl Serialize for ProbeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProbeOutcome", 3)?;
        state.serialize_field("result", self.label())?;
        match self {
            ProbeOutcome::Success => {
                state.skip_field("kind")?;
                state.skip_field("detail")?;
            }
            ProbeOutcome::Failure(failure) => {
                state.serialize_field("kind", failure.kind())?;
                state.serialize_field("detail", &failure.to_string())?;
            }
            ProbeOutcome::TimedOut { elapsed } => {
                state.serialize_field("kind", "timeout")?;
                state.serialize_field(
                    "detail",
                    &ProbeError::TimedOut(*elapsed).to_string(),
                )?;
            }
        }
        state.end()
    }
}

/// Outcome plus the bookkeeping printed by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub target: String,
    pub namespace: String,
    pub test_class: String,
    pub outcome: ProbeOutcome,
    pub started_at: DateTime<Utc>,
    pub execution_time_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(timeout: Duration) -> Result<ProbeRequest> {
        ProbeRequest::new(
            Endpoint::parse("http://server:5988").unwrap(),
            Credentials::new("user", "secret"),
            timeout,
        )
    }

    #[test]
    fn test_request_rejects_zero_timeout() {
        assert_eq!(
            request(Duration::ZERO).unwrap_err(),
            DomainError::InvalidTimeout(0)
        );
    }

    #[test]
    fn test_request_defaults_and_test_class() {
        let req = request(Duration::from_millis(20000)).unwrap();
        assert_eq!(req.test_class(), DEFAULT_TEST_CLASS);
        assert_eq!(req.timeout(), Duration::from_secs(20));

        let req = req.with_test_class(" CIM_Namespace ").unwrap();
        assert_eq!(req.test_class(), "CIM_Namespace");

        assert!(req.with_test_class("").is_err());
    }

    #[test]
    fn test_into_result_preserves_distinction() {
        assert!(ProbeOutcome::Success.into_result().is_ok());

        let err = RemoteError::Authentication("HTTP 401".to_string());
        assert_eq!(
            ProbeOutcome::Failure(ProbeFailure::Remote(err.clone())).into_result(),
            Err(ProbeError::Remote(err))
        );

        let timed_out = ProbeOutcome::TimedOut {
            elapsed: Duration::from_millis(200),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(timed_out.to_string(), "Timed out after 200ms");
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(ProbeOutcome::Success).unwrap();
        assert_eq!(value, serde_json::json!({ "result": "success" }));

        let value = serde_json::to_value(ProbeOutcome::Failure(ProbeFailure::Remote(
            RemoteError::Connection("refused".to_string()),
        )))
        .unwrap();
        assert_eq!(value["result"], "failure");
        assert_eq!(value["kind"], "connection");
        assert_eq!(value["detail"], "Connection failed: refused");

        let value = serde_json::to_value(ProbeOutcome::Failure(ProbeFailure::Remote(
            RemoteError::Cim {
                code: 6,
                description: "no such instance".to_string(),
            },
        )))
        .unwrap();
        assert_eq!(value["kind"], "cim");
        assert_eq!(
            value["detail"],
            "CIM error 6 (CIM_ERR_NOT_FOUND): no such instance"
        );

        let value = serde_json::to_value(ProbeOutcome::TimedOut {
            elapsed: Duration::from_millis(150),
        })
        .unwrap();
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["detail"], "Timed out after 150ms");
    }
}
