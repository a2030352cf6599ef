//! Per-host availability summaries.

use std::fmt;

use hostwatch_core::Host;

use crate::checker::ProbeResult;

/// One host's availability for one round.
///
/// `Display` renders the report line:
/// `"{hostname} has {percentage}% availability percentage"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSummary {
    hostname: String,
    up: usize,
    total: usize,
    hundredths: u64,
}

impl HostSummary {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn up(&self) -> usize {
        self.up
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Availability in hundredths of a percent (7500 is 75%).
    pub fn hundredths(&self) -> u64 {
        self.hundredths
    }

    /// Availability as rendered in the report line.
    pub fn percentage(&self) -> String {
        format_percentage(self.hundredths)
    }
}

impl fmt::Display for HostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has {}% availability percentage",
            self.hostname,
            self.percentage()
        )
    }
}

/// Summarize one round of probe results for `host`.
///
/// `results` are in the same order as `host.endpoints()`. The total is the
/// host's endpoint count; a host without endpoints is 0% available.
pub fn summarize(host: &Host, results: &[ProbeResult]) -> HostSummary {
    debug_assert_eq!(results.len(), host.endpoints().len());

    let total = host.endpoints().len();
    let up = results.iter().filter(|r| r.is_up()).count().min(total);

    HostSummary {
        hostname: host.hostname().to_string(),
        up,
        total,
        hundredths: availability_hundredths(up, total),
    }
}

/// `round(up * 100 / total, 2)` in hundredths, computed exactly with
/// ties rounded up.
fn availability_hundredths(up: usize, total: usize) -> u64 {
    if total == 0 {
        return 0;
    }
    let up = up as u64;
    let total = total as u64;
    (up * 20_000 + total) / (2 * total)
}

/// Render hundredths of a percent with up to two fraction digits.
///
/// Trailing zeros are trimmed but one fraction digit is always kept:
/// `7500 → "75.0"`, `3333 → "33.33"`, `1250 → "12.5"`.
pub fn format_percentage(hundredths: u64) -> String {
    let whole = hundredths / 100;
    let frac = hundredths % 100;
    if frac % 10 == 0 {
        format!("{whole}.{}", frac / 10)
    } else {
        format!("{whole}.{frac:02}")
    }
}
