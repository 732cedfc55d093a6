// Probe constants (No magic values)

/// Default probe deadline in milliseconds (20s)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 20_000;

/// Name given to every probe worker thread (shows up in panic messages)
pub const WORKER_THREAD_NAME: &str = "wbemping-worker";

/// Message used when a worker exits without reporting
pub const WORKER_LOST_MESSAGE: &str = "worker exited without reporting an outcome";
