//! Driver loop: probe, evaluate, escalate, report, sleep.

use crate::escalation::{EscalationDecision, EscalationPolicy};
use crate::hysteresis::HysteresisEvaluator;
use crate::metrics::MetricsRegistry;
use crate::probes::SignalProbe;
use crate::report::ReportScheduler;
use crate::sinks::{CheckLog, Notifier, Remediation};
use crate::types::{CycleSnapshot, ProbeOutcome, ProbeReport, SignalSpec, SignalStatus, Verdict};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

/// Timing and escalation settings for the driver loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogSettings {
    /// Sleep between the end of one cycle and the start of the next
    #[serde(with = "humantime_serde")]
    pub cycle_interval: Duration,

    /// Upper bound for a single probe call
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Minimum time between status reports
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,

    /// Failing signals needed to trigger remediation
    pub escalation_threshold: usize,

    /// Pause after remediation before the cycle continues
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(30),
            report_interval: Duration::from_secs(300),
            escalation_threshold: 2,
            cooldown: Duration::from_secs(300),
        }
    }
}

/// A configured signal: what it is and how to sample it
pub struct Signal {
    pub spec: SignalSpec,
    pub probe: Arc<dyn SignalProbe>,
}

impl Signal {
    pub fn new(spec: SignalSpec, probe: Arc<dyn SignalProbe>) -> Self {
        Self { spec, probe }
    }
}

struct SignalSlot {
    spec: SignalSpec,
    probe: Arc<dyn SignalProbe>,
    evaluator: HysteresisEvaluator,
}

/// Outbound collaborators of the watchdog
pub struct Sinks {
    pub notifier: Arc<dyn Notifier>,
    pub check_log: Arc<dyn CheckLog>,
    pub remediation: Arc<dyn Remediation>,
}

/// Health watchdog.
///
/// Owns all evaluation state: one hysteresis evaluator per signal, the
/// escalation policy and the report scheduler. Cycles never overlap, and
/// evaluator state is only touched after every probe of the cycle has
/// returned, so a snapshot never mixes verdicts from different cycles.
pub struct Watchdog {
    signals: Vec<SignalSlot>,
    settings: WatchdogSettings,
    policy: EscalationPolicy,
    reports: ReportScheduler,
    notifier: Arc<dyn Notifier>,
    check_log: Arc<dyn CheckLog>,
    metrics: Option<Arc<MetricsRegistry>>,
    cycle: u64,
}

impl Watchdog {
    /// Create a new watchdog
    pub fn new(
        settings: WatchdogSettings,
        signals: Vec<Signal>,
        sinks: Sinks,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        let signals = signals
            .into_iter()
            .map(|s| SignalSlot {
                evaluator: HysteresisEvaluator::new(s.spec.threshold),
                spec: s.spec,
                probe: s.probe,
            })
            .collect();

        let policy = EscalationPolicy::new(
            settings.escalation_threshold,
            settings.cooldown,
            sinks.notifier.clone(),
            sinks.remediation,
        );
        let reports = ReportScheduler::new(settings.report_interval, Instant::now());

        Self {
            signals,
            settings,
            policy,
            reports,
            notifier: sinks.notifier,
            check_log: sinks.check_log,
            metrics,
            cycle: 0,
        }
    }

    /// Announce that monitoring has (re)started
    pub async fn announce_online(&self) {
        let restarted_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.alert(&format!(
            "The monitoring bot has restarted at {} and is now actively monitoring.",
            restarted_at
        ))
        .await;
    }

    /// Run forever
    pub async fn run(mut self) {
        info!(
            signals = self.signals.len(),
            interval_secs = self.settings.cycle_interval.as_secs(),
            "Entering main loop"
        );
        self.announce_online().await;

        loop {
            self.run_cycle().await;
            sleep(self.settings.cycle_interval).await;
        }
    }

    /// Run one full cycle and return its snapshot.
    ///
    /// Escalation cooldown happens inline, before the report check of the
    /// same cycle.
    pub async fn run_cycle(&mut self) -> CycleSnapshot {
        let started = Instant::now();
        self.cycle += 1;
        info!(cycle = self.cycle, "Checking statuses");

        let reports = self.probe_all().await;

        let mut statuses = Vec::with_capacity(self.signals.len());
        for (slot, report) in self.signals.iter_mut().zip(reports) {
            let verdict = slot.evaluator.evaluate(&report.outcome);
            let streak = slot.evaluator.streak();

            match &report.outcome {
                ProbeOutcome::Pass => {
                    debug!(signal = %slot.spec.id, "Check passed");
                }
                ProbeOutcome::Fail(reason) => {
                    warn!(
                        signal = %slot.spec.id,
                        reason = %reason,
                        streak,
                        threshold = slot.evaluator.threshold(),
                        verdict = %verdict,
                        "Check failed"
                    );
                }
                ProbeOutcome::Error(detail) => {
                    warn!(
                        signal = %slot.spec.id,
                        error = %detail,
                        streak,
                        threshold = slot.evaluator.threshold(),
                        verdict = %verdict,
                        "Check error"
                    );
                }
            }

            if let Some(ref m) = self.metrics {
                m.record_check(&slot.spec.id, verdict, streak, report.duration);
                if matches!(report.outcome, ProbeOutcome::Error(_)) {
                    m.record_probe_error(&slot.spec.id);
                }
            }

            statuses.push((
                SignalStatus {
                    id: slot.spec.id.clone(),
                    label: slot.spec.label.clone(),
                    kind: slot.spec.kind,
                    verdict,
                    streak,
                    aux: report.aux,
                },
                report.outcome,
            ));
        }

        // Narration and history go out after the whole set is evaluated
        for (status, outcome) in &statuses {
            if let ProbeOutcome::Error(detail) = outcome {
                self.alert(&format!("Error checking {}: {}", status.label, detail))
                    .await;
            }
            self.log_check(&status.label, status.verdict).await;
        }

        let snapshot = CycleSnapshot::new(
            self.cycle,
            statuses.into_iter().map(|(status, _)| status).collect(),
        );
        info!(
            cycle = snapshot.cycle,
            passes = snapshot.passing_count(),
            fails = snapshot.failing_count(),
            "Cycle evaluated"
        );
        if let Some(ref m) = self.metrics {
            m.record_cycle(snapshot.failing_count(), snapshot.backlog_count, started.elapsed());
        }

        if let EscalationDecision::Trigger { failing } = self.policy.assess(&snapshot) {
            let outcome = self.policy.escalate(failing).await;
            if let Some(ref m) = self.metrics {
                m.record_escalation(outcome.remediated);
            }
        }

        if let Some(report) = self.reports.maybe_report(Instant::now(), &snapshot) {
            if let Some(ref m) = self.metrics {
                m.record_report();
            }
            match self.notifier.report(&report).await {
                Ok(()) => info!(cycle = snapshot.cycle, "Status update sent"),
                Err(e) => {
                    warn!(error = %e, "Failed to send status update");
                    self.record_sink_error("notifier");
                }
            }
        }

        snapshot
    }

    /// Sample every signal concurrently, each bounded by the probe timeout
    async fn probe_all(&self) -> Vec<ProbeReport> {
        let limit = self.settings.probe_timeout;
        let calls = self.signals.iter().map(|slot| {
            let probe = slot.probe.clone();
            async move {
                let start = Instant::now();
                match timeout(limit, probe.probe()).await {
                    Ok(report) => report,
                    Err(_) => ProbeReport::new(
                        ProbeOutcome::error(format!("{} probe timed out after {:?}", probe.name(), limit)),
                        start.elapsed(),
                    ),
                }
            }
        });
        join_all(calls).await
    }

    async fn alert(&self, message: &str) {
        if let Err(e) = self.notifier.alert(message).await {
            warn!(error = %e, "Failed to send alert");
            self.record_sink_error("notifier");
        }
    }

    async fn log_check(&self, label: &str, verdict: Verdict) {
        if let Err(e) = self.check_log.log_check(label, verdict).await {
            warn!(check = label, error = %e, "Failed to record check");
            self.record_sink_error("check_log");
            self.alert(&format!("Error logging check {}: {}", label, e)).await;
        }
    }

    fn record_sink_error(&self, sink: &str) {
        if let Some(ref m) = self.metrics {
            m.record_sink_error(sink);
        }
    }

    /// Current failure streak of a signal
    pub fn streak(&self, id: &str) -> Option<u32> {
        self.signals
            .iter()
            .find(|s| s.spec.id == id)
            .map(|s| s.evaluator.streak())
    }

    pub fn escalations(&self) -> u64 {
        self.policy.escalations()
    }
}
