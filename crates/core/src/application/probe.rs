// Bounded Probe Executor & Probe Service

use crate::application::worker::constants::WORKER_LOST_MESSAGE;
use crate::application::worker::Worker;
use crate::domain::{
    Credentials, DomainError, Endpoint, ProbeFailure, ProbeOutcome, ProbeReport, ProbeRequest,
};
use crate::port::RemoteConnector;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Runs one blocking remote probe under a wall-clock deadline
///
/// Every call to [`ProbeExecutor::run`] spawns a fresh [`Worker`] thread and
/// resolves to exactly one [`ProbeOutcome`]. On timeout the worker is
/// abandoned: no cancellation is sent, it may keep its socket open until the
/// remote call returns on its own.
pub struct ProbeExecutor {
    connector: Arc<dyn RemoteConnector>,
    launched: AtomicUsize,
}

impl ProbeExecutor {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            connector,
            launched: AtomicUsize::new(0),
        }
    }

    /// Number of worker threads this executor has started
    pub fn workers_launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    /// Execute one probe attempt
    ///
    /// Never panics and never returns an error: remote failures, worker
    /// faults and the deadline are all encoded in the outcome.
    pub async fn run(&self, request: &ProbeRequest) -> ProbeOutcome {
        let deadline = request.timeout();
        let worker = Worker::new(request.clone(), Arc::clone(&self.connector));

        let completion = match worker.start() {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "Failed to spawn probe worker");
                return ProbeOutcome::Failure(ProbeFailure::Unexpected(format!(
                    "failed to spawn worker thread: {}",
                    e
                )));
            }
        };
        self.launched.fetch_add(1, Ordering::SeqCst);

        match timeout(deadline, completion).await {
            Ok(Ok(None)) => ProbeOutcome::Success,
            Ok(Ok(Some(failure))) => ProbeOutcome::Failure(failure),
            Ok(Err(_)) => {
                // Sender dropped without a send: the thread died outside the guard
                ProbeOutcome::Failure(ProbeFailure::Unexpected(WORKER_LOST_MESSAGE.to_string()))
            }
            Err(_) => {
                warn!(
                    endpoint = %request.endpoint(),
                    timeout_ms = %deadline.as_millis(),
                    "Probe deadline elapsed, abandoning worker"
                );
                ProbeOutcome::TimedOut { elapsed: deadline }
            }
        }
    }
}

/// Raw, unvalidated probe input (as collected by a front end)
#[derive(Debug, Clone)]
pub struct ProbeInput {
    pub target: String,
    pub principal: Option<String>,
    pub secret: Option<String>,
    pub namespace: Option<String>,
    pub timeout: Duration,
    pub test_class: Option<String>,
}

/// Validates input and runs probes, producing printable reports
pub struct ProbeService {
    executor: ProbeExecutor,
}

impl ProbeService {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            executor: ProbeExecutor::new(connector),
        }
    }

    pub fn executor(&self) -> &ProbeExecutor {
        &self.executor
    }

    /// Turn raw input into a [`ProbeRequest`]
    ///
    /// All malformed-input errors surface here, before any worker exists.
    ///
    /// # Errors
    /// - DomainError::MissingArgument if principal or secret is absent
    /// - DomainError::InvalidEndpoint if the target cannot be parsed
    /// - DomainError::InvalidTimeout if the timeout is zero
    pub fn prepare(&self, input: ProbeInput) -> Result<ProbeRequest, DomainError> {
        let principal = input
            .principal
            .ok_or(DomainError::MissingArgument("username"))?;
        let secret = input.secret.ok_or(DomainError::MissingArgument("password"))?;

        let mut endpoint = Endpoint::parse(&input.target)?;
        if let Some(namespace) = input.namespace.as_deref() {
            endpoint = endpoint.with_namespace(namespace)?;
        }

        let request = ProbeRequest::new(
            endpoint,
            Credentials::new(principal, secret),
            input.timeout,
        )?;

        match input.test_class.as_deref() {
            Some(class_name) => request.with_test_class(class_name),
            None => Ok(request),
        }
    }

    /// Run one probe and wrap the outcome in a report
    pub async fn probe(&self, request: &ProbeRequest) -> ProbeReport {
        let endpoint = request.endpoint();
        info!(
            target = %endpoint.url(),
            namespace = %endpoint.namespace(),
            class_name = %request.test_class(),
            timeout_ms = %request.timeout().as_millis(),
            "Starting probe"
        );

        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let outcome = self.executor.run(request).await;
        let execution_time_ms = start.elapsed().as_millis();

        match &outcome {
            ProbeOutcome::Success => {
                info!(target = %endpoint.url(), execution_time_ms = %execution_time_ms, "Probe succeeded");
            }
            ProbeOutcome::Failure(failure) => {
                warn!(
                    target = %endpoint.url(),
                    kind = failure.kind(),
                    error = %failure,
                    execution_time_ms = %execution_time_ms,
                    "Probe failed"
                );
            }
            ProbeOutcome::TimedOut { elapsed } => {
                warn!(
                    target = %endpoint.url(),
                    elapsed_ms = %elapsed.as_millis(),
                    "Probe timed out"
                );
            }
        }

        ProbeReport {
            target: endpoint.url(),
            namespace: endpoint.namespace().to_string(),
            test_class: request.test_class().to_string(),
            outcome,
            started_at,
            execution_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::remote::mocks::{MockBehavior, MockConnector};
    use crate::port::RemoteError;

    fn request(timeout_ms: u64) -> ProbeRequest {
        ProbeRequest::new(
            Endpoint::parse("http://server:5988/interop").unwrap(),
            Credentials::new("sheldon", "penny"),
            Duration::from_millis(timeout_ms),
        )
        .unwrap()
    }

    fn input(target: &str) -> ProbeInput {
        ProbeInput {
            target: target.to_string(),
            principal: Some("sheldon".to_string()),
            secret: Some("penny".to_string()),
            namespace: None,
            timeout: Duration::from_millis(20000),
            test_class: None,
        }
    }

    #[tokio::test]
    async fn test_run_success() {
        let connector = MockConnector::new_success();
        let executor = ProbeExecutor::new(Arc::new(connector.clone()));

        let start = Instant::now();
        let outcome = executor.run(&request(20000)).await;

        assert_eq!(outcome, ProbeOutcome::Success);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(executor.workers_launched(), 1);
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test]
    async fn test_run_failure_carries_exact_cause() {
        let err = RemoteError::Authentication("HTTP 401 Unauthorized".to_string());
        let connector = MockConnector::new(MockBehavior::FailConnect(err.clone()));
        let executor = ProbeExecutor::new(Arc::new(connector));

        let outcome = executor.run(&request(20000)).await;

        assert_eq!(outcome, ProbeOutcome::Failure(ProbeFailure::Remote(err)));
    }

    #[tokio::test]
    async fn test_run_timeout_returns_at_deadline() {
        let connector = MockConnector::new_hanging(Duration::from_millis(5000));
        let executor = ProbeExecutor::new(Arc::new(connector.clone()));

        let start = Instant::now();
        let outcome = executor.run(&request(200)).await;
        let waited = start.elapsed();

        assert_eq!(
            outcome,
            ProbeOutcome::TimedOut {
                elapsed: Duration::from_millis(200)
            }
        );
        assert!(waited >= Duration::from_millis(200));
        assert!(waited < Duration::from_millis(1500), "waited {:?}", waited);
        assert_eq!(connector.finished_count(), 0);
    }

    #[tokio::test]
    async fn test_run_captures_panic_as_unexpected() {
        let connector = MockConnector::new_panic_inducing("illegal state");
        let executor = ProbeExecutor::new(Arc::new(connector));

        let outcome = executor.run(&request(20000)).await;

        assert_eq!(
            outcome,
            ProbeOutcome::Failure(ProbeFailure::Unexpected(
                "worker panicked: illegal state".to_string()
            ))
        );
    }

    #[test]
    fn test_run_from_synchronous_caller() {
        let executor = ProbeExecutor::new(Arc::new(MockConnector::new_success()));

        let outcome = tokio_test::block_on(executor.run(&request(1000)));

        assert!(outcome.is_success());
    }

    #[test]
    fn test_prepare_rejects_empty_endpoint_without_worker() {
        let connector = MockConnector::new_success();
        let service = ProbeService::new(Arc::new(connector.clone()));

        let result = service.prepare(input(""));

        assert!(matches!(result, Err(DomainError::InvalidEndpoint { .. })));
        assert_eq!(service.executor().workers_launched(), 0);
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn test_prepare_rejects_unsafe_hosts_without_worker() {
        let connector = MockConnector::new_success();
        let service = ProbeService::new(Arc::new(connector.clone()));

        for bad in ["my server", "server?x", "http://host#frag", "bad\u{7f}host"] {
            let result = service.prepare(input(bad));
            assert!(
                matches!(result, Err(DomainError::InvalidEndpoint { .. })),
                "expected '{}' to be rejected, got {:?}",
                bad,
                result
            );
        }
        assert_eq!(service.executor().workers_launched(), 0);
        assert_eq!(connector.connect_count(), 0);
    }

    #[test]
    fn test_prepare_missing_arguments() {
        let service = ProbeService::new(Arc::new(MockConnector::new_success()));

        let mut no_user = input("server");
        no_user.principal = None;
        assert_eq!(
            service.prepare(no_user).unwrap_err(),
            DomainError::MissingArgument("username")
        );

        let mut no_password = input("server");
        no_password.secret = None;
        assert_eq!(
            service.prepare(no_password).unwrap_err(),
            DomainError::MissingArgument("password")
        );
    }

    #[test]
    fn test_prepare_applies_overrides() {
        let service = ProbeService::new(Arc::new(MockConnector::new_success()));

        let mut raw = input("http://server/root/cimv2");
        raw.namespace = Some("interop".to_string());
        raw.test_class = Some("CIM_Namespace".to_string());

        let request = service.prepare(raw).unwrap();
        assert_eq!(request.endpoint().namespace(), "interop");
        assert_eq!(request.test_class(), "CIM_Namespace");

        let mut zero = input("server");
        zero.timeout = Duration::ZERO;
        assert_eq!(
            service.prepare(zero).unwrap_err(),
            DomainError::InvalidTimeout(0)
        );
    }

    #[tokio::test]
    async fn test_probe_report() {
        let service = ProbeService::new(Arc::new(MockConnector::new_success()));
        let request = service.prepare(input("http://server:5988/interop")).unwrap();

        let report = service.probe(&request).await;

        assert!(report.outcome.is_success());
        assert_eq!(report.target, "http://server:5988");
        assert_eq!(report.namespace, "interop");
        assert_eq!(report.test_class, "CIM_ComputerSystem");
    }
}
