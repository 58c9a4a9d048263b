//! Periodic health checking of every registered server.
//!
//! Each cycle lists the registry, probes every entry concurrently (one
//! task per entry), writes each result back with
//! [`Registry::push_status`] and publishes a servers `SYNC` only when the
//! stored status actually changed. Every `resync_cycles` cycles all
//! entries are published regardless, so a consumer that missed an
//! envelope converges without polling.
//!
//! A failing probe is an offline server, never an error. A storage error
//! for one entry is logged and the cycle carries on with the rest.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::registry::Registry;
use crate::domain::{PingStatus, PushOutcome, ServerEntry};
use crate::protocol::{Prober, status_or_offline};

/// Health scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Time between cycle starts.
    pub interval: Duration,
    /// Per-probe connect and exchange bound.
    pub timeout: Duration,
    /// Publish every entry every this many cycles; 0 disables resync.
    pub resync_cycles: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            resync_cycles: 30,
        }
    }
}

impl HealthConfig {
    fn is_resync(&self, cycle: u64) -> bool {
        self.resync_cycles != 0 && cycle % self.resync_cycles == 0
    }
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entries probed.
    pub probed: usize,
    /// Entries that answered the probe.
    pub online: usize,
    /// Entries whose stored status changed.
    pub changed: usize,
    /// Servers `SYNC` envelopes published.
    pub published: usize,
    /// Entries whose write-back or publish failed.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct ProbeReport {
    online: bool,
    changed: bool,
    published: bool,
    failed: bool,
}

/// Drives health cycles until shut down.
#[derive(Debug, Clone)]
pub struct HealthScheduler {
    registry: Arc<Registry>,
    prober: Arc<dyn Prober>,
    config: HealthConfig,
}

impl HealthScheduler {
    /// Creates a scheduler probing through `prober`.
    #[must_use]
    pub fn new(registry: Arc<Registry>, prober: Arc<dyn Prober>, config: HealthConfig) -> Self {
        Self {
            registry,
            prober,
            config,
        }
    }

    /// Runs cycles every `interval` until `shutdown` flips to `true` or its
    /// sender is dropped.
    ///
    /// A cycle that overruns the interval delays the next one rather than
    /// stacking them.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.config.interval.as_millis(),
            timeout_ms = self.config.timeout.as_millis(),
            resync_cycles = self.config.resync_cycles,
            "health scheduler started"
        );

        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_cycle(cycle).await;
                    tracing::debug!(cycle, ?report, "health cycle finished");
                    cycle = cycle.wrapping_add(1);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("health scheduler stopped");
    }

    /// Runs one cycle. `cycle` numbers the cycle from 0 and decides
    /// whether it is a resync cycle.
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let entries = match self.registry.get_all_server_entries().await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(error = %err, "health cycle cannot list servers");
                return CycleReport::default();
            }
        };

        let resync = self.config.is_resync(cycle);
        let mut tasks = JoinSet::new();
        for entry in entries {
            let registry = Arc::clone(&self.registry);
            let prober = Arc::clone(&self.prober);
            let timeout = self.config.timeout;
            tasks.spawn(check_entry(registry, prober, entry, timeout, resync));
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            report.probed += 1;
            match joined {
                Ok(result) => {
                    report.online += usize::from(result.online);
                    report.changed += usize::from(result.changed);
                    report.published += usize::from(result.published);
                    report.failed += usize::from(result.failed);
                }
                Err(err) => {
                    tracing::error!(error = %err, "health probe task failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

async fn check_entry(
    registry: Arc<Registry>,
    prober: Arc<dyn Prober>,
    entry: ServerEntry,
    timeout: Duration,
    resync: bool,
) -> ProbeReport {
    // The probe bounds connect and exchange separately; this caps the sum.
    let status = tokio::time::timeout(
        timeout.saturating_mul(2),
        status_or_offline(prober.as_ref(), &entry.address, entry.port, timeout),
    )
    .await
    .unwrap_or_else(|_| PingStatus::offline());

    let mut report = ProbeReport {
        online: status.online,
        ..ProbeReport::default()
    };

    let outcome = match registry.push_status(&entry.name, &status).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(server = %entry.name, error = %err, "cannot store probed status");
            report.failed = true;
            return report;
        }
    };

    match outcome {
        PushOutcome::NotFound => return report,
        PushOutcome::Changed => {
            report.changed = true;
            tracing::info!(server = %entry.name, online = status.online, "server status changed");
        }
        PushOutcome::Unchanged if !resync => return report,
        PushOutcome::Unchanged => {}
    }

    let current = match registry.get_server_entry(&entry.name).await {
        Ok(current) => current,
        // Removed between write-back and publish.
        Err(crate::error::NebulaError::ServerNotFound(_)) => return report,
        Err(err) => {
            tracing::error!(server = %entry.name, error = %err, "cannot reload server entry");
            report.failed = true;
            return report;
        }
    };

    match registry.announce_server(current).await {
        Ok(()) => report.published = true,
        Err(err) => {
            tracing::error!(server = %entry.name, error = %err, "cannot publish server status");
            report.failed = true;
        }
    }
    report
}
