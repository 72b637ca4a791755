//! Prometheus metrics for the watchdog engine.

use crate::types::Verdict;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for per-signal metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SignalLabels {
    /// Signal id (icecast, liquidsoap_cpu, ...)
    pub signal: String,
}

/// Labels for check verdict metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CheckLabels {
    pub signal: String,
    /// pass or fail
    pub verdict: String,
}

/// Labels for sink error metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SinkLabels {
    /// notifier or check_log
    pub sink: String,
}

/// Metrics registry with all watchdog metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    checks_total: Family<CheckLabels, Counter>,
    probe_errors_total: Family<SignalLabels, Counter>,
    /// Current consecutive failure streak
    signal_streak: Family<SignalLabels, Gauge>,
    /// 1 while the verdict is fail
    signal_failing: Family<SignalLabels, Gauge>,
    probe_duration_seconds: Family<SignalLabels, Histogram>,

    failing_signals: Gauge,
    escalations_total: Counter,
    remediation_failures_total: Counter,
    reports_total: Counter,
    sink_errors_total: Family<SinkLabels, Counter>,
    backlog_segments: Gauge,
    cycle_duration_seconds: Histogram,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let checks_total = Family::<CheckLabels, Counter>::default();
        registry.register(
            "watchdog_checks",
            "Signal checks by post-hysteresis verdict",
            checks_total.clone(),
        );

        let probe_errors_total = Family::<SignalLabels, Counter>::default();
        registry.register(
            "watchdog_probe_errors",
            "Probe executions that could not complete",
            probe_errors_total.clone(),
        );

        let signal_streak = Family::<SignalLabels, Gauge>::default();
        registry.register(
            "watchdog_signal_streak",
            "Current consecutive failure streak",
            signal_streak.clone(),
        );

        let signal_failing = Family::<SignalLabels, Gauge>::default();
        registry.register(
            "watchdog_signal_failing",
            "Signal verdict (1=fail, 0=pass)",
            signal_failing.clone(),
        );

        let probe_duration_seconds: Family<SignalLabels, Histogram> =
            Family::new_with_constructor(|| {
                // 1ms to ~32s
                Histogram::new(exponential_buckets(0.001, 2.0, 16))
            });
        registry.register(
            "watchdog_probe_duration_seconds",
            "Probe duration in seconds",
            probe_duration_seconds.clone(),
        );

        let failing_signals = Gauge::default();
        registry.register(
            "watchdog_failing_signals",
            "Signals with a fail verdict in the last cycle",
            failing_signals.clone(),
        );

        let escalations_total = Counter::default();
        registry.register(
            "watchdog_escalations",
            "Remediation triggers",
            escalations_total.clone(),
        );

        let remediation_failures_total = Counter::default();
        registry.register(
            "watchdog_remediation_failures",
            "Remediation triggers that reported failure",
            remediation_failures_total.clone(),
        );

        let reports_total = Counter::default();
        registry.register(
            "watchdog_reports",
            "Status reports built",
            reports_total.clone(),
        );

        let sink_errors_total = Family::<SinkLabels, Counter>::default();
        registry.register(
            "watchdog_sink_errors",
            "Delivery failures by sink",
            sink_errors_total.clone(),
        );

        let backlog_segments = Gauge::default();
        registry.register(
            "watchdog_backlog_segments",
            "Output segments currently on disk",
            backlog_segments.clone(),
        );

        let cycle_duration_seconds = Histogram::new(exponential_buckets(0.01, 2.0, 14));
        registry.register(
            "watchdog_cycle_duration_seconds",
            "Cycle duration excluding cooldown and inter-cycle sleep",
            cycle_duration_seconds.clone(),
        );

        Self {
            registry,
            checks_total,
            probe_errors_total,
            signal_streak,
            signal_failing,
            probe_duration_seconds,
            failing_signals,
            escalations_total,
            remediation_failures_total,
            reports_total,
            sink_errors_total,
            backlog_segments,
            cycle_duration_seconds,
        }
    }

    /// Record one evaluated check
    pub fn record_check(&self, signal: &str, verdict: Verdict, streak: u32, duration: Duration) {
        self.checks_total
            .get_or_create(&CheckLabels {
                signal: signal.to_string(),
                verdict: verdict.as_str().to_string(),
            })
            .inc();

        let labels = SignalLabels {
            signal: signal.to_string(),
        };
        self.signal_streak.get_or_create(&labels).set(streak as i64);
        self.signal_failing
            .get_or_create(&labels)
            .set(if verdict.is_fail() { 1 } else { 0 });
        self.probe_duration_seconds
            .get_or_create(&labels)
            .observe(duration.as_secs_f64());
    }

    pub fn record_probe_error(&self, signal: &str) {
        self.probe_errors_total
            .get_or_create(&SignalLabels {
                signal: signal.to_string(),
            })
            .inc();
    }

    /// Record the aggregate of a finished evaluation
    pub fn record_cycle(&self, failing: usize, backlog: Option<usize>, duration: Duration) {
        self.failing_signals.set(failing as i64);
        if let Some(count) = backlog {
            self.backlog_segments.set(count as i64);
        }
        self.cycle_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn record_escalation(&self, remediated: bool) {
        self.escalations_total.inc();
        if !remediated {
            self.remediation_failures_total.inc();
        }
    }

    pub fn record_report(&self) {
        self.reports_total.inc();
    }

    pub fn record_sink_error(&self, sink: &str) {
        self.sink_errors_total
            .get_or_create(&SinkLabels {
                sink: sink.to_string(),
            })
            .inc();
    }
}
