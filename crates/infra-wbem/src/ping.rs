// Reachability pre-check through the system ping binary
// reason: raw ICMP sockets need privileges, the ping binary does not
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Program invoked for the pre-check
pub const PING_PROGRAM: &str = "ping";

/// How long a single echo request may wait for its reply
pub const DEFAULT_PING_WAIT: Duration = Duration::from_secs(2);

/// Extra time the child gets beyond its own wait before it is killed
const PING_GRACE: Duration = Duration::from_secs(1);

/// Sends one echo request to a host and reports whether it answered
pub struct SystemPinger {
    program: String,
    wait: Duration,
}

impl SystemPinger {
    pub fn new(wait: Duration) -> Self {
        Self::with_program(PING_PROGRAM, wait)
    }

    /// Use another binary with ping's exit-status convention
    pub fn with_program(program: impl Into<String>, wait: Duration) -> Self {
        Self {
            program: program.into(),
            wait,
        }
    }

    #[cfg(not(windows))]
    fn args(&self, host: &str) -> Vec<String> {
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            self.wait.as_secs().max(1).to_string(),
            host.to_string(),
        ]
    }

    #[cfg(windows)]
    fn args(&self, host: &str) -> Vec<String> {
        vec![
            "-n".to_string(),
            "1".to_string(),
            "-w".to_string(),
            self.wait.as_millis().max(1).to_string(),
            host.to_string(),
        ]
    }

    /// Ping `host` once
    ///
    /// Returns `Ok(false)` when the host does not answer or the child
    /// outlives its wait. IPv6 brackets are stripped.
    ///
    /// # Errors
    /// The ping program could not be started or awaited.
    pub async fn ping(&self, host: &str) -> std::io::Result<bool> {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        debug!(program = %self.program, host = %host, "Pinging host");

        let mut child = Command::new(&self.program)
            .args(self.args(host))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        match timeout(self.wait + PING_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!(host = %host, exit_code = ?status.code(), "Ping finished");
                Ok(status.success())
            }
            Err(_) => {
                warn!(host = %host, wait_ms = %self.wait.as_millis(), "Ping did not finish in time");
                Ok(false)
            }
        }
    }
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self::new(DEFAULT_PING_WAIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_args_send_one_request() {
        let pinger = SystemPinger::new(Duration::from_millis(2500));
        assert_eq!(pinger.args("10.1.132.4"), vec!["-c", "1", "-W", "2", "10.1.132.4"]);

        let pinger = SystemPinger::new(Duration::from_millis(100));
        assert_eq!(pinger.args("server")[3], "1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_decides_reachability() {
        let answered = SystemPinger::with_program("true", DEFAULT_PING_WAIT);
        assert!(answered.ping("[::1]").await.unwrap());

        let silent = SystemPinger::with_program("false", DEFAULT_PING_WAIT);
        assert!(!silent.ping("server").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let pinger = SystemPinger::with_program("/nonexistent/wbemping-ping", DEFAULT_PING_WAIT);

        assert!(pinger.ping("server").await.is_err());
    }
}
