//! Report sinks for completed rounds.

use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::summary::HostSummary;

/// The outcome of one completed round, hosts in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: u64,
    pub summaries: Vec<HostSummary>,
    /// Wall time spent probing.
    pub elapsed: Duration,
}

impl RoundReport {
    /// The report lines, one per host.
    pub fn lines(&self) -> Vec<String> {
        self.summaries.iter().map(ToString::to_string).collect()
    }
}

/// Receives each completed round. Called once per round, never for an
/// abandoned one.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &RoundReport);
}

/// Writes report lines to stdout, one block per round.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&self, report: &RoundReport) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = write_round(&mut out, report) {
            warn!(round = report.round, error = %e, "failed to write report");
        }
    }
}

fn write_round(out: &mut impl Write, report: &RoundReport) -> std::io::Result<()> {
    for summary in &report.summaries {
        writeln!(out, "{summary}")?;
    }
    out.flush()
}

/// Forwards rounds to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<RoundReport>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RoundReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, report: &RoundReport) {
        if self.tx.send(report.clone()).is_err() {
            debug!(round = report.round, "report receiver dropped");
        }
    }
}
