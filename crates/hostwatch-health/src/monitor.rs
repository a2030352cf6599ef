//! Health runner — drives rounds of probing on a fixed schedule.
//!
//! Every round probes every endpoint of every host, summarizes each host
//! once all of its probes are in, and hands the summaries to the
//! reporter in host order. Rounds fire at `start + k * interval`; a round
//! that overruns the interval makes the runner skip the ticks it missed
//! and resume on the original grid. Rounds never overlap.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use hostwatch_core::Host;

use crate::checker::{DownCause, ProbeResult, Prober, DEFAULT_PROBE_TIMEOUT};
use crate::error::{HealthError, HealthResult};
use crate::report::{Reporter, RoundReport};
use crate::summary::summarize;

/// Time between scheduled round starts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Maximum probes in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 32;

/// Timing and concurrency settings for a [`HealthRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Time between scheduled round starts.
    pub interval: Duration,
    /// Upper bound on a single probe, enforced around every [`Prober`].
    pub probe_timeout: Duration,
    /// Maximum number of probes in flight at once.
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl RunnerConfig {
    /// Reject zero durations and zero concurrency.
    pub fn validate(&self) -> HealthResult<()> {
        if self.interval.is_zero() {
            return Err(HealthError::InvalidConfig("interval must be non-zero".into()));
        }
        if self.probe_timeout.is_zero() {
            return Err(HealthError::InvalidConfig(
                "probe timeout must be non-zero".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(HealthError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed-rate schedule anchored at the first round.
#[derive(Debug)]
struct RoundClock {
    deadline: Instant,
    interval: Duration,
}

impl RoundClock {
    /// The first round is due at `start`.
    fn new(start: Instant, interval: Duration) -> Self {
        Self {
            deadline: start,
            interval,
        }
    }

    fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Move to the next slot that is not already in the past at `now`.
    /// Returns how many slots were skipped.
    fn advance(&mut self, now: Instant) -> u64 {
        self.deadline += self.interval;
        let mut skipped = 0;
        while self.deadline < now {
            self.deadline += self.interval;
            skipped += 1;
        }
        skipped
    }
}

/// Probes a fixed set of hosts in rounds and reports each round.
pub struct HealthRunner {
    hosts: Arc<[Host]>,
    prober: Arc<dyn Prober>,
    reporter: Arc<dyn Reporter>,
    config: RunnerConfig,
    rounds: u64,
}

impl HealthRunner {
    /// Build a runner over `hosts`. Fails if `config` does not validate.
    pub fn new(
        hosts: impl Into<Arc<[Host]>>,
        prober: Arc<dyn Prober>,
        reporter: Arc<dyn Reporter>,
        config: RunnerConfig,
    ) -> HealthResult<Self> {
        config.validate()?;
        Ok(Self {
            hosts: hosts.into(),
            prober,
            reporter,
            config,
            rounds: 0,
        })
    }

    /// Hosts probed each round, in report order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Settings the runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Number of rounds completed and reported.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Run one full round immediately and report it.
    pub async fn run_round(&mut self) -> RoundReport {
        let started = Instant::now();
        let results = self.probe_all().await;
        self.complete_round(results, started.elapsed())
    }

    /// Run rounds until `shutdown` fires (or its sender is dropped).
    ///
    /// A shutdown that arrives while a round is probing abandons that
    /// round: its probes are dropped and nothing is reported for it.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let endpoints: usize = self.hosts.iter().map(|h| h.endpoints().len()).sum();
        info!(
            hosts = self.hosts.len(),
            endpoints,
            interval_secs = self.config.interval.as_secs_f64(),
            probe_timeout_ms = self.config.probe_timeout.as_millis() as u64,
            concurrency = self.config.concurrency,
            "health runner started"
        );

        let mut clock = RoundClock::new(Instant::now(), self.config.interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(clock.deadline()) => {}
                _ = shutdown.changed() => break,
            }

            let started = Instant::now();
            let results = tokio::select! {
                results = self.probe_all() => results,
                _ = shutdown.changed() => {
                    warn!(round = self.rounds + 1, "shutdown during probing, round abandoned");
                    break;
                }
            };
            self.complete_round(results, started.elapsed());

            let skipped = clock.advance(Instant::now());
            if skipped > 0 {
                warn!(
                    round = self.rounds,
                    skipped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    interval_ms = self.config.interval.as_millis() as u64,
                    "round overran the interval, skipping missed ticks"
                );
            }
        }

        info!(rounds = self.rounds, "health runner stopped");
    }

    /// Probe every endpoint, at most `concurrency` at a time. The result
    /// has one vector per host, in endpoint order.
    ///
    /// The returned future owns its hosts and prober handles, so it can be
    /// spawned or raced against shutdown without borrowing the runner.
    fn probe_all(&self) -> impl Future<Output = Vec<Vec<ProbeResult>>> + Send + use<> {
        let hosts = Arc::clone(&self.hosts);
        let prober = Arc::clone(&self.prober);
        let timeout = self.config.probe_timeout;
        let concurrency = self.config.concurrency;

        let sizes: Vec<usize> = hosts.iter().map(|host| host.endpoints().len()).collect();
        let jobs: Vec<(usize, usize)> = sizes
            .iter()
            .enumerate()
            .flat_map(|(h, &len)| (0..len).map(move |e| (h, e)))
            .collect();

        async move {
            let mut completed: Vec<(usize, usize, ProbeResult)> = stream::iter(jobs)
                .map(move |(h, e)| {
                    let hosts = Arc::clone(&hosts);
                    let prober = Arc::clone(&prober);
                    async move {
                        let endpoint = &hosts[h].endpoints()[e];
                        let result = tokio::time::timeout(timeout, prober.probe(endpoint))
                            .await
                            .unwrap_or(ProbeResult::Down(DownCause::Timeout));
                        (h, e, result)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            // Completion order is arbitrary; restore (host, endpoint) order.
            completed.sort_unstable_by_key(|(h, e, _)| (*h, *e));

            let mut results: Vec<Vec<ProbeResult>> =
                sizes.iter().map(|&len| Vec::with_capacity(len)).collect();
            for (h, _, result) in completed {
                results[h].push(result);
            }
            results
        }
    }

    fn complete_round(&mut self, results: Vec<Vec<ProbeResult>>, elapsed: Duration) -> RoundReport {
        self.rounds += 1;
        let summaries = self
            .hosts
            .iter()
            .zip(&results)
            .map(|(host, results)| summarize(host, results))
            .collect();
        let report = RoundReport {
            round: self.rounds,
            summaries,
            elapsed,
        };

        debug!(
            round = report.round,
            elapsed_ms = elapsed.as_millis() as u64,
            "round complete"
        );
        self.reporter.report(&report);
        report
    }
}
