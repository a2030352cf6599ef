//! hostwatch-health — probing, aggregation, and the round runner.
//!
//! # Architecture
//!
//! ```text
//! HealthRunner (owns Arc<[Host]>, round counter)
//!   ├── RoundClock (slots at start + k*interval, busy slots skipped)
//!   ├── Prober::probe() per endpoint, bounded by `concurrency`
//!   │   └── HttpProber → ProbeResult { Up | Down(DownCause) }
//!   ├── summarize() per host → HostSummary
//!   └── Reporter::report() per round, in host order
//! ```
//!
//! An endpoint is up iff it answers with a 2xx status before the probe
//! timeout. Probe failures never leave the prober: they become
//! `ProbeResult::Down` with a cause for the logs.

pub mod checker;
pub mod error;
pub mod monitor;
pub mod report;
pub mod summary;

pub use checker::{BoxFuture, DownCause, HttpProber, ProbeResult, Prober, DEFAULT_PROBE_TIMEOUT};
pub use error::{HealthError, HealthResult};
pub use monitor::{HealthRunner, RunnerConfig, DEFAULT_CONCURRENCY, DEFAULT_INTERVAL};
pub use report::{ChannelReporter, Reporter, RoundReport, StdoutReporter};
pub use summary::{format_percentage, summarize, HostSummary};
