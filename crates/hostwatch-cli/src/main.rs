//! hostwatch — periodic HTTP health checks, reported as availability per host.
//!
//! # Usage
//!
//! ```text
//! hostwatch --file-path endpoints.yaml
//! ```
//!
//! Report lines go to stdout, one per host per round. Diagnostics go to
//! stderr and are filtered with `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use hostwatch_core::Host;
use hostwatch_health::{
    HealthRunner, HttpProber, RunnerConfig, StdoutReporter, DEFAULT_CONCURRENCY, DEFAULT_INTERVAL,
    DEFAULT_PROBE_TIMEOUT,
};

const DEFAULT_INTERVAL_SECS: u64 = DEFAULT_INTERVAL.as_secs();
const DEFAULT_TIMEOUT_MS: u64 = DEFAULT_PROBE_TIMEOUT.as_millis() as u64;

#[derive(Debug, Parser)]
#[command(
    name = "hostwatch",
    about = "Probe HTTP endpoints and report availability per host",
    version
)]
struct Cli {
    /// Endpoints file (YAML, or TOML when the extension is .toml).
    #[arg(long, env = "HOSTWATCH_FILE")]
    file_path: PathBuf,

    /// Seconds between scheduled rounds.
    #[arg(
        long,
        env = "HOSTWATCH_INTERVAL_SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = RangedU64ValueParser::<u64>::new().range(1..)
    )]
    interval_secs: u64,

    /// Per-probe timeout in milliseconds.
    #[arg(
        long,
        env = "HOSTWATCH_TIMEOUT_MS",
        default_value_t = DEFAULT_TIMEOUT_MS,
        value_parser = RangedU64ValueParser::<u64>::new().range(1..)
    )]
    timeout_ms: u64,

    /// Maximum number of probes in flight at once.
    #[arg(
        long,
        env = "HOSTWATCH_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    concurrency: usize,
}

impl Cli {
    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            interval: Duration::from_secs(self.interval_secs),
            probe_timeout: Duration::from_millis(self.timeout_ms),
            concurrency: self.concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hostwatch=info")),
        )
        .init();

    let cli = Cli::parse();
    let hosts = load_hosts(&cli.file_path)?;
    let config = cli.runner_config();

    let prober = HttpProber::new(config.probe_timeout)?;
    let mut runner = HealthRunner::new(hosts, Arc::new(prober), Arc::new(StdoutReporter), config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    handle.await?;
    Ok(())
}

fn load_hosts(path: &Path) -> anyhow::Result<Vec<Host>> {
    hostwatch_core::load_hosts(path)
        .with_context(|| format!("failed to load endpoints from {}", path.display()))
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cli = Cli::try_parse_from(["hostwatch", "--file-path", "endpoints.yaml"]).unwrap();
        assert_eq!(cli.file_path, PathBuf::from("endpoints.yaml"));

        let config = cli.runner_config();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.probe_timeout, Duration::from_millis(500));
        assert_eq!(config.concurrency, 32);
    }

    #[test]
    fn timings_are_overridable() {
        let cli = Cli::try_parse_from([
            "hostwatch",
            "--file-path",
            "e.yaml",
            "--interval-secs",
            "5",
            "--timeout-ms",
            "250",
            "--concurrency",
            "4",
        ])
        .unwrap();
        let config = cli.runner_config();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn file_path_is_required() {
        assert!(Cli::try_parse_from(["hostwatch"]).is_err());
    }

    #[test]
    fn zero_values_are_rejected() {
        for flag in ["--interval-secs", "--timeout-ms", "--concurrency"] {
            let result = Cli::try_parse_from(["hostwatch", "--file-path", "e.yaml", flag, "0"]);
            assert!(result.is_err(), "{flag} 0 should be rejected");
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_hosts(Path::new("/no/such/endpoints.yaml")).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("file not found"), "{chain}");
    }

    #[test]
    fn unsupported_method_fails_startup() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "- name: patch\n  url: https://a.com/\n  method: PATCH").unwrap();
        let err = load_hosts(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported HTTP method `PATCH`"));
    }

    #[test]
    fn loads_toml_endpoints() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[[endpoints]]\nname = \"a\"\nurl = \"https://a.com/\"\n\n[[endpoints]]\nname = \"b\"\nurl = \"https://b.com/\"\nmethod = \"head\""
        )
        .unwrap();
        let hosts = load_hosts(file.path()).unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[1].hostname(), "b.com");
    }
}
