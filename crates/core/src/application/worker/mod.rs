// Worker - the independent execution unit of a probe attempt

pub mod constants;
mod panic_guard;

use constants::*;
pub use panic_guard::catch_panic;

use crate::domain::{ProbeFailure, ProbeRequest};
use crate::port::{RemoteConnector, RemoteError};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// What the worker hands back: `None` on success, the captured cause otherwise
pub type CapturedCause = Option<ProbeFailure>;

/// Runs the blocking remote sequence on its own OS thread
///
/// The worker is never joined, signalled or killed. Once its probe has
/// stopped waiting, it runs to completion (or forever) unobserved and its
/// late result is dropped.
pub struct Worker {
    request: ProbeRequest,
    connector: Arc<dyn RemoteConnector>,
}

impl Worker {
    pub fn new(request: ProbeRequest, connector: Arc<dyn RemoteConnector>) -> Self {
        Self { request, connector }
    }

    /// Spawn the worker thread
    ///
    /// The returned receiver resolves exactly once with the captured cause.
    /// The cause is the message itself, so it is fully written before the
    /// caller can observe completion.
    ///
    /// # Errors
    /// The OS refused to create the thread.
    pub fn start(self) -> std::io::Result<oneshot::Receiver<CapturedCause>> {
        let (tx, rx) = oneshot::channel();

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let captured = self.execute();
                if tx.send(captured).is_err() {
                    debug!(
                        endpoint = %self.request.endpoint(),
                        "Probe no longer waiting, late worker result discarded"
                    );
                }
            })?;

        Ok(rx)
    }

    /// Run the remote sequence, turning every error and panic into data
    fn execute(&self) -> CapturedCause {
        match catch_panic(AssertUnwindSafe(|| self.probe_remote())) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(ProbeFailure::Remote(err)),
            Err(msg) => {
                Some(ProbeFailure::Unexpected(format!("worker panicked: {}", msg)))
            }
        }
    }

    /// connect -> enumerate one class -> close
    fn probe_remote(&self) -> Result<(), RemoteError> {
        let endpoint = self.request.endpoint();
        let class_name = self.request.test_class();

        let mut session = self
            .connector
            .connect(endpoint, self.request.credentials())?;

        let count = match session.enumerate_instances(class_name) {
            Ok(count) => count,
            Err(err) => {
                // The query error is the cause; a close error would hide it
                if let Err(close_err) = session.close() {
                    debug!(error = %close_err, "Session close failed after query error");
                }
                return Err(err);
            }
        };

        debug!(
            endpoint = %endpoint,
            class_name = %class_name,
            instances = count,
            "Enumeration completed"
        );

        session.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, Endpoint};
    use crate::port::remote::mocks::{MockBehavior, MockConnector};
    use std::time::Duration;

    fn request() -> ProbeRequest {
        ProbeRequest::new(
            Endpoint::parse("http://server").unwrap(),
            Credentials::new("user", "secret"),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_execute_success_closes_session() {
        let connector = MockConnector::new_success();
        let worker = Worker::new(request(), Arc::new(connector.clone()));

        assert_eq!(worker.execute(), None);
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(connector.close_count(), 1);
    }

    #[test]
    fn test_execute_captures_connect_error() {
        let err = RemoteError::Connection("refused".to_string());
        let connector = MockConnector::new(MockBehavior::FailConnect(err.clone()));
        let worker = Worker::new(request(), Arc::new(connector.clone()));

        assert_eq!(worker.execute(), Some(ProbeFailure::Remote(err)));
        assert_eq!(connector.close_count(), 0);
    }

    #[test]
    fn test_query_error_wins_over_close() {
        let err = RemoteError::Cim {
            code: 5,
            description: "no such class".to_string(),
        };
        let connector = MockConnector::new(MockBehavior::FailQuery(err.clone()));
        let worker = Worker::new(request(), Arc::new(connector.clone()));

        assert_eq!(worker.execute(), Some(ProbeFailure::Remote(err)));
        assert_eq!(connector.close_count(), 1);
    }

    #[test]
    fn test_close_error_is_captured() {
        let err = RemoteError::Protocol("connection reset".to_string());
        let connector = MockConnector::new(MockBehavior::FailClose(err.clone()));
        let worker = Worker::new(request(), Arc::new(connector));

        assert_eq!(worker.execute(), Some(ProbeFailure::Remote(err)));
    }

    #[test]
    fn test_execute_captures_panic() {
        let connector = MockConnector::new_panic_inducing("session handle was None");
        let worker = Worker::new(request(), Arc::new(connector));

        assert_eq!(
            worker.execute(),
            Some(ProbeFailure::Unexpected(
                "worker panicked: session handle was None".to_string()
            ))
        );
    }

    #[test]
    fn test_start_delivers_cause_once() {
        let connector = MockConnector::new_success();
        let worker = Worker::new(request(), Arc::new(connector));

        let rx = worker.start().unwrap();
        assert_eq!(rx.blocking_recv(), Ok(None));
    }
}
