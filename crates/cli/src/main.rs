//! wbemping - Bounded WBEM ping
//! Connects to a WBEM server, enumerates one class and reports the outcome
//! within a fixed deadline.

mod logging;
mod output;

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use wbemping_core::application::worker::constants::DEFAULT_PROBE_TIMEOUT_MS;
use wbemping_core::application::{ProbeInput, ProbeService};
use wbemping_infra_wbem::{CimXmlConnector, SystemPinger};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extra I/O time granted to the HTTP client beyond the probe deadline.
/// The deadline always fires first; the client timeout only ends an abandoned worker.
const ABANDONED_WORKER_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "wbemping")]
#[command(about = "Check that a WBEM server answers an authenticated request in time", long_about = None)]
#[command(version)]
struct Cli {
    /// WBEM server: [http|https://]host[:port][/namespace]
    server: String,

    /// User name
    #[arg(env = "WBEMPING_USER")]
    user: Option<String>,

    /// Password
    #[arg(env = "WBEMPING_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Namespace (overrides the one in the server URL, default "root/cimv2")
    #[arg(short, long, env = "WBEMPING_NAMESPACE")]
    namespace: Option<String>,

    /// Probe deadline in milliseconds
    #[arg(short, long = "timeout-ms", env = "WBEMPING_TIMEOUT_MS", default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Class to enumerate (default "CIM_ComputerSystem")
    #[arg(short = 'c', long = "class")]
    class: Option<String>,

    /// Verify the server TLS certificate
    #[arg(long)]
    verify_cert: bool,

    /// Skip the ping pre-check
    #[arg(short = 'x', long)]
    no_ping: bool,

    /// Print the last CIM-XML request and reply
    #[arg(short, long)]
    debug: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print a result table and info-level logs
    #[arg(short, long)]
    verbose: bool,
}

/// Usage errors exit as malformed input; `--help` and `--version` succeed
fn parse_error_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        output::EXIT_MALFORMED_INPUT
    } else {
        output::EXIT_SUCCESS
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if e.print().is_err() {
                eprintln!("{}", e);
            }
            return ExitCode::from(parse_error_exit_code(&e));
        }
    };

    // 1. Initialize logging
    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("warning: logging disabled: {:#}", e);
    }
    info!("wbemping v{} starting...", VERSION);

    // 2. Setup dependencies (DI wiring)
    let timeout = Duration::from_millis(cli.timeout_ms);
    let mut connector = CimXmlConnector::new(
        Some(timeout.saturating_add(ABANDONED_WORKER_GRACE)),
        cli.verify_cert,
    );
    if cli.debug {
        connector = connector.with_exchange_capture();
    }
    let connector = Arc::new(connector);
    let service = ProbeService::new(connector.clone());

    // 3. Validate input before any worker exists
    let request = match service.prepare(ProbeInput {
        target: cli.server,
        principal: cli.user,
        secret: cli.password,
        namespace: cli.namespace,
        timeout,
        test_class: cli.class,
    }) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            eprintln!("Usage: wbemping <SERVER> <USER> <PASSWORD> [OPTIONS]");
            return ExitCode::from(output::EXIT_MALFORMED_INPUT);
        }
    };

    // 4. Ping pre-check
    if !cli.no_ping {
        let host = request.endpoint().host();
        let answered = match SystemPinger::default().ping(host).await {
            Ok(answered) => answered,
            Err(e) => {
                warn!(error = %e, "Could not run ping, treating host as unreachable");
                false
            }
        };
        if !answered {
            if let Err(e) = output::print_ping_failure(&request.endpoint().url(), host, cli.json) {
                error!(error = ?e, "Failed to print report");
            }
            return ExitCode::from(output::EXIT_PING_FAILED);
        }
    }

    // 5. Probe
    let report = service.probe(&request).await;

    if let Err(e) = output::print_report(&report, cli.json, cli.verbose) {
        error!(error = ?e, "Failed to print report");
    }
    if cli.debug {
        eprint!("{}", output::render_exchange(connector.last_exchange().as_ref()));
    }

    // An abandoned worker may still be running; returning ends the process anyway
    ExitCode::from(output::exit_code(&report.outcome))
}
