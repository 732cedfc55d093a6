// Remote-Call Port
// Abstraction over "open session / run one query / close" against a WBEM server.
// All methods are blocking and may never return; the probe executor bounds them.

use crate::domain::{Credentials, Endpoint};
use thiserror::Error;

/// Errors raised by a remote-call implementation
///
/// Cloneable so a captured cause can be handed across threads and compared
/// against the error that was raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("CIM error {code} ({}): {description}", status_label(.code))]
    Cim { code: u32, description: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport timeout: {0}")]
    Timeout(String),

    /// The client could not build the request at all
    #[error("Internal client error: {0}")]
    Internal(String),
}

impl RemoteError {
    /// Short machine-readable kind (used in logs and JSON output)
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Connection(_) => "connection",
            RemoteError::Authentication(_) => "authentication",
            RemoteError::Cim { .. } => "cim",
            RemoteError::Protocol(_) => "protocol",
            RemoteError::Timeout(_) => "timeout",
            RemoteError::Internal(_) => "internal",
        }
    }
}

fn status_label(code: &u32) -> &'static str {
    cim_status_name(*code)
}

/// Map a CIM status code (DSP0200) to its symbolic name
pub fn cim_status_name(code: u32) -> &'static str {
    match code {
        1 => "CIM_ERR_FAILED",
        2 => "CIM_ERR_ACCESS_DENIED",
        3 => "CIM_ERR_INVALID_NAMESPACE",
        4 => "CIM_ERR_INVALID_PARAMETER",
        5 => "CIM_ERR_INVALID_CLASS",
        6 => "CIM_ERR_NOT_FOUND",
        7 => "CIM_ERR_NOT_SUPPORTED",
        8 => "CIM_ERR_CLASS_HAS_CHILDREN",
        9 => "CIM_ERR_CLASS_HAS_INSTANCES",
        10 => "CIM_ERR_INVALID_SUPERCLASS",
        11 => "CIM_ERR_ALREADY_EXISTS",
        12 => "CIM_ERR_NO_SUCH_PROPERTY",
        13 => "CIM_ERR_TYPE_MISMATCH",
        14 => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
        15 => "CIM_ERR_INVALID_QUERY",
        16 => "CIM_ERR_METHOD_NOT_AVAILABLE",
        17 => "CIM_ERR_METHOD_NOT_FOUND",
        20 => "CIM_ERR_NAMESPACE_NOT_EMPTY",
        21 => "CIM_ERR_INVALID_ENUMERATION_CONTEXT",
        22 => "CIM_ERR_INVALID_OPERATION_TIMEOUT",
        23 => "CIM_ERR_PULL_HAS_BEEN_ABANDONED",
        24 => "CIM_ERR_PULL_CANNOT_BE_ABANDONED",
        25 => "CIM_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED",
        26 => "CIM_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED",
        27 => "CIM_ERR_SERVER_LIMITS_EXCEEDED",
        28 => "CIM_ERR_SERVER_IS_SHUTTING_DOWN",
        _ => "CIM_ERR_UNKNOWN",
    }
}

/// Factory for remote sessions
///
/// Implementations:
/// - CimXmlConnector (infra-wbem): CIM-XML over HTTP(S)
/// - MockConnector: scripted behavior for tests
pub trait RemoteConnector: Send + Sync {
    /// Establish a session using the supplied credentials
    ///
    /// # Errors
    /// - RemoteError::Connection if the server cannot be reached
    /// - RemoteError::Authentication if the credentials are rejected
    fn connect(
        &self,
        endpoint: &Endpoint,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, RemoteError>;
}

/// An open session against one endpoint
pub trait RemoteSession: Send {
    /// Enumerate the instances of `class_name` in the session namespace
    ///
    /// Returns the number of instances received.
    fn enumerate_instances(&mut self, class_name: &str) -> Result<usize, RemoteError>;

    /// Release the session
    fn close(self: Box<Self>) -> Result<(), RemoteError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock connector behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Connect, query and close all succeed
        Success,
        /// `connect` fails with the given error
        FailConnect(RemoteError),
        /// `enumerate_instances` fails with the given error
        FailQuery(RemoteError),
        /// `close` fails with the given error
        FailClose(RemoteError),
        /// The query panics with message (for panic isolation testing)
        Panic(String),
        /// The query blocks for the duration, then succeeds
        Hang(Duration),
        /// The query blocks for the duration, then fails
        HangThenFail(Duration, RemoteError),
    }

    #[derive(Debug, Default)]
    struct Counters {
        connects: usize,
        queries_finished: usize,
        closes: usize,
    }

    /// Mock RemoteConnector for testing
    #[derive(Clone)]
    pub struct MockConnector {
        behavior: Arc<Mutex<MockBehavior>>,
        counters: Arc<Mutex<Counters>>,
    }

    impl MockConnector {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                counters: Arc::new(Mutex::new(Counters::default())),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_hanging(duration: Duration) -> Self {
            Self::new(MockBehavior::Hang(duration))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
        /// Number of `connect` calls observed
        pub fn connect_count(&self) -> usize {
            self.counters.lock().unwrap().connects
        }
        /// Number of queries that returned (successfully or not)
        pub fn finished_count(&self) -> usize {
            self.counters.lock().unwrap().queries_finished
        }
        /// Number of sessions closed
        pub fn close_count(&self) -> usize {
            self.counters.lock().unwrap().closes
        }
    }

    impl RemoteConnector for MockConnector {
        fn connect(
            &self,
            _endpoint: &Endpoint,
            _credentials: &Credentials,
        ) -> Result<Box<dyn RemoteSession>, RemoteError> {
            self.counters.lock().unwrap().connects += 1;

            let behavior = self.behavior.lock().unwrap().clone();
            if let MockBehavior::FailConnect(err) = behavior {
                return Err(err);
            }
            Ok(Box::new(MockSession {
                behavior,
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    struct MockSession {
        behavior: MockBehavior,
        counters: Arc<Mutex<Counters>>,
    }

    impl RemoteSession for MockSession {
        fn enumerate_instances(&mut self, _class_name: &str) -> Result<usize, RemoteError> {
            let result = match &self.behavior {
                MockBehavior::FailQuery(err) => Err(err.clone()),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Hang(duration) => {
                    std::thread::sleep(*duration);
                    Ok(1)
                }
                MockBehavior::HangThenFail(duration, err) => {
                    std::thread::sleep(*duration);
                    Err(err.clone())
                }
                _ => Ok(1),
            };
            self.counters.lock().unwrap().queries_finished += 1;
            result
        }

        fn close(self: Box<Self>) -> Result<(), RemoteError> {
            self.counters.lock().unwrap().closes += 1;
            match self.behavior {
                MockBehavior::FailClose(err) => Err(err),
                _ => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_preserves_detail() {
        let err = RemoteError::Cim {
            code: 2,
            description: "bad user".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "CIM error 2 (CIM_ERR_ACCESS_DENIED): bad user"
        );
        assert_eq!(err.kind(), "cim");

        let err = RemoteError::Authentication("HTTP 401".to_string());
        assert_eq!(err.to_string(), "Authentication failed: HTTP 401");
    }

    #[test]
    fn test_unknown_cim_status() {
        assert_eq!(cim_status_name(99), "CIM_ERR_UNKNOWN");
        assert_eq!(cim_status_name(6), "CIM_ERR_NOT_FOUND");
    }
}
