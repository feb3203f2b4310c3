//! Command-line definition and run loop for pin-forge.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reqwest::Url;
use tracing::{info, warn};

use super::prompt::resolve_host_port;
use crate::config::{
    HttpMethod, SearchConfig, Target, DEFAULT_ENDPOINT, DEFAULT_FLAG_KEY, DEFAULT_MAX_RETRIES,
    DEFAULT_PARAM, DEFAULT_THREADS,
};
use crate::error::ConfigError;
use crate::search::progress::display_flag;
use crate::search::{Coordinator, ProgressReporter, ReqwestTransport, SearchSummary, TerminationReason};

/// Exit code for a run stopped with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

const DESCRIPTION: &str =
    "Concurrent 4-digit PIN search for CTF-style endpoints. Run only against authorized targets.";

/// Brute-force a 4-digit PIN endpoint (authorized testing only).
#[derive(Parser, Debug)]
#[command(name = "pin-forge")]
#[command(about = "Brute-force a 4-digit PIN endpoint (authorized testing only)")]
#[command(version)]
#[command(
    long_about = "pin-forge tries every PIN from 0000 to 9999 against one HTTP(S) endpoint and reports the PINs the server accepts.\n\nMissing --host/--port are asked for interactively.\n\nExample usage:\n  pin-forge --host 10.10.10.5 --port 8080 --endpoint /pin --threads 20 --stop-on-found"
)]
pub struct Cli {
    /// Target IP or hostname (interactive if omitted).
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Target port (interactive if omitted).
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Endpoint path.
    #[arg(short = 'e', long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Query/body parameter name for the PIN.
    #[arg(short = 'k', long, default_value = DEFAULT_PARAM)]
    pub param: String,

    /// HTTP method (GET or POST).
    #[arg(short = 'm', long, default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// Use HTTPS instead of HTTP.
    #[arg(long)]
    pub https: bool,

    /// Concurrent workers.
    #[arg(short = 't', long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Request timeout in seconds.
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    pub timeout: Duration,

    /// Delay between attempts per worker, in seconds.
    #[arg(long, default_value = "0", value_parser = parse_seconds)]
    pub delay: Duration,

    /// Retry attempts on transient errors.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub retries: u32,

    /// Base backoff before the first retry, in seconds (doubles per retry).
    #[arg(long, default_value = "0.5", value_parser = parse_seconds)]
    pub backoff: Duration,

    /// Random extra backoff as a fraction of the delay (0 to 1).
    #[arg(long, default_value_t = 0.0)]
    pub jitter: f64,

    /// JSON key that contains the flag (empty to disable).
    #[arg(long, default_value = DEFAULT_FLAG_KEY)]
    pub flag_key: String,

    /// Send every request through this HTTP(S) proxy.
    #[arg(long, value_parser = parse_url)]
    pub proxy: Option<Url>,

    /// Ignore HTTP_PROXY/HTTPS_PROXY from the environment.
    #[arg(long)]
    pub no_system_proxy: bool,

    /// Stop after the first accepted PIN.
    #[arg(long)]
    pub stop_on_found: bool,

    /// Print the final summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON summary to this file.
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Skip the startup banner.
    #[arg(long)]
    pub no_banner: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,
}

fn parse_method(s: &str) -> Result<HttpMethod, String> {
    s.parse().map_err(|e: ConfigError| e.to_string())
}

fn parse_url(s: &str) -> Result<Url, String> {
    Url::parse(s).map_err(|e| format!("invalid URL '{}': {}", s, e))
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", s))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

/// Parse CLI arguments from the process.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the search described by `cli`. Returns the process exit code.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<i32> {
    let (host, port) = {
        let mut stdin = io::stdin().lock();
        let mut stdout = io::stdout();
        resolve_host_port(cli.host.clone(), cli.port, &mut stdin, &mut stdout)
            .context("Failed to read target details")?
    };

    let config = build_config(&cli, host, port)?;
    if !cli.no_banner {
        print!("{}", render_banner(&config));
    }

    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let coordinator = Arc::new(Coordinator::new(config)?);

    let watcher = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Unable to listen for Ctrl-C");
                return;
            }
            coordinator.interrupt();
            // Second Ctrl-C skips waiting for in-flight attempts.
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(EXIT_INTERRUPTED);
            }
        })
    };

    let summary = coordinator
        .run(transport, Arc::new(ProgressReporter::stdout()))
        .await?;
    watcher.abort();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render_summary(&summary));
    }

    if let Some(path) = &cli.output {
        write_summary(&summary, Path::new(path))?;
        info!(path = %path, "Summary written");
    }

    Ok(exit_code(summary.termination))
}

/// Builds the run configuration from parsed arguments and the resolved
/// host/port.
pub fn build_config(cli: &Cli, host: String, port: u16) -> Result<SearchConfig, ConfigError> {
    let target = Target::new(host, port)
        .with_https(cli.https)
        .with_endpoint(cli.endpoint.clone());

    let config = SearchConfig::for_target(&target)?
        .with_method(cli.method)
        .with_param_name(cli.param.clone())
        .with_flag_key(Some(cli.flag_key.clone()))
        .with_threads(cli.threads)
        .with_timeout(cli.timeout)
        .with_delay(cli.delay)
        .with_max_retries(cli.retries)
        .with_backoff_base(cli.backoff)
        .with_jitter(cli.jitter)
        .with_stop_on_found(cli.stop_on_found)
        .with_proxy(cli.proxy.clone());
    let config = if cli.no_system_proxy {
        config.without_system_proxy()
    } else {
        config
    };
    config.validate()?;
    Ok(config)
}

pub fn render_banner(config: &SearchConfig) -> String {
    let rule = "-".repeat(DESCRIPTION.len());
    let mut out = String::new();
    let _ = writeln!(out, "pin-forge {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "{}", DESCRIPTION);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Target: {}  Method: {}  Param: {}",
        config.target_url, config.method, config.param_name
    );
    let _ = writeln!(
        out,
        "Threads: {}, timeout: {}s, retries: {}, delay: {}s",
        config.thread_count,
        config.timeout.as_secs_f64(),
        config.max_retries,
        config.delay.as_secs_f64()
    );
    let _ = writeln!(out, "Starting... (Ctrl-C to stop)");
    let _ = writeln!(out);
    out
}

pub fn render_summary(summary: &SearchSummary) -> String {
    let reason = match summary.termination {
        TerminationReason::Exhausted => "all candidates tried",
        TerminationReason::FoundAndStopped => "stopped after first PIN found",
        TerminationReason::Interrupted => "interrupted by user",
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Finished ({}): {} attempts in {:.1}s.",
        reason,
        summary.total_attempts,
        summary.elapsed.as_secs_f64()
    );
    if summary.fatal_attempts > 0 {
        let _ = writeln!(
            out,
            "{} candidate(s) skipped after exhausting retries.",
            summary.fatal_attempts
        );
    }

    if summary.found.is_empty() {
        let _ = writeln!(out, "No PINs found.");
    } else {
        let _ = writeln!(out, "Found {} PIN(s):", summary.found.len());
        for found in &summary.found {
            match &found.flag {
                Some(flag) => {
                    let _ = writeln!(out, " - {} -> {}", found.pin, display_flag(flag));
                }
                None => {
                    let _ = writeln!(out, " - {}", found.pin);
                }
            }
        }
    }
    out
}

/// Writes the summary as pretty JSON.
pub fn write_summary(summary: &SearchSummary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("Failed to write summary to {}", path.display()))
}

pub fn exit_code(termination: TerminationReason) -> i32 {
    match termination {
        TerminationReason::Interrupted => EXIT_INTERRUPTED,
        TerminationReason::Exhausted | TerminationReason::FoundAndStopped => 0,
    }
}
