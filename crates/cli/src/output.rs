//! Result rendering and exit-code mapping

use anyhow::Result;
use colored::Colorize;
use tabled::{Table, Tabled};
use wbemping_core::domain::{ProbeFailure, ProbeOutcome, ProbeReport};
use wbemping_core::port::RemoteError;
use wbemping_infra_wbem::CimExchange;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_CIM_ERROR: u8 = 1;
/// Client-side WBEM errors: protocol violations and rejected credentials
pub const EXIT_CLIENT_ERROR: u8 = 2;
pub const EXIT_UNEXPECTED: u8 = 3;
pub const EXIT_TIMEOUT: u8 = 4;
pub const EXIT_CONNECTION_ERROR: u8 = 5;
pub const EXIT_PING_FAILED: u8 = 6;
/// Bad arguments, including clap usage errors (EX_USAGE)
pub const EXIT_MALFORMED_INPUT: u8 = 64;

/// Process exit code for an outcome
pub fn exit_code(outcome: &ProbeOutcome) -> u8 {
    match outcome {
        ProbeOutcome::Success => EXIT_SUCCESS,
        ProbeOutcome::Failure(ProbeFailure::Remote(err)) => match err {
            RemoteError::Cim { .. } => EXIT_CIM_ERROR,
            RemoteError::Protocol(_) | RemoteError::Authentication(_) => EXIT_CLIENT_ERROR,
            RemoteError::Internal(_) => EXIT_UNEXPECTED,
            RemoteError::Timeout(_) => EXIT_TIMEOUT,
            RemoteError::Connection(_) => EXIT_CONNECTION_ERROR,
        },
        ProbeOutcome::Failure(ProbeFailure::Unexpected(_)) => EXIT_UNEXPECTED,
        ProbeOutcome::TimedOut { .. } => EXIT_TIMEOUT,
    }
}

/// One-line human description of a non-success outcome
pub fn describe(outcome: &ProbeOutcome) -> Option<String> {
    match outcome {
        ProbeOutcome::Success => None,
        ProbeOutcome::Failure(failure) => Some(failure.to_string()),
        ProbeOutcome::TimedOut { elapsed } => {
            Some(format!("Timed out after {}ms", elapsed.as_millis()))
        }
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Class")]
    test_class: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Started")]
    started_at: String,
    #[tabled(rename = "Time (ms)")]
    execution_time_ms: u128,
}

/// Print the report: result on stdout, failure detail on stderr
pub fn print_report(report: &ProbeReport, json: bool, verbose: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if verbose {
        let row = ReportRow {
            target: report.target.clone(),
            namespace: report.namespace.clone(),
            test_class: report.test_class.clone(),
            result: report.outcome.label().to_string(),
            started_at: report.started_at.to_rfc3339(),
            execution_time_ms: report.execution_time_ms,
        };
        println!("{}", Table::new(vec![row]));
    }

    match describe(&report.outcome) {
        None => println!("{}", "Running".green().bold()),
        Some(detail) => eprintln!("{} {}", "✗".red().bold(), detail),
    }

    Ok(())
}

/// JSON form of a failed ping pre-check
pub fn ping_failure_json(target: &str, host: &str) -> serde_json::Value {
    serde_json::json!({
        "target": target,
        "outcome": {
            "result": "ping_failed",
            "kind": "ping",
            "detail": format!("Ping failed: {} did not answer", host),
        },
    })
}

/// Print a failed ping pre-check
pub fn print_ping_failure(target: &str, host: &str, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ping_failure_json(target, host))?
        );
    } else {
        eprintln!(
            "{} Ping failed: {} did not answer",
            "✗".red().bold(),
            host
        );
    }
    Ok(())
}

/// Render the last CIM-XML request and reply for `--debug`
pub fn render_exchange(exchange: Option<&CimExchange>) -> String {
    match exchange {
        None => "Request:\n\n<none>\n\nReply:\n\n<none>\n".to_string(),
        Some(exchange) => format!(
            "Request:\n\n{}\n\nReply:\n\n{}\n",
            exchange.request,
            exchange.reply.as_deref().unwrap_or("<none>")
        ),
    }
}
